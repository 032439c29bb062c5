use chrono::{DateTime, Utc};
use sanitize_filename::sanitize;

/// Extensions accepted by the upload form. Matching is on the segment after
/// the last dot, case-insensitive; names without a dot never match.
pub const ALLOWED_EXTENSIONS: [&str; 1] = ["mp4"];

pub fn allowed_extension(filename: &str) -> bool {
    let Some((_, ext)) = filename.rsplit_once('.') else {
        return false;
    };
    ALLOWED_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
}

/// Sanitize a client-supplied filename down to something safe to join onto
/// the uploads directory. Returns `None` when nothing survives.
pub fn sanitize_upload_name(raw: &str) -> Option<String> {
    let name = sanitize(raw.trim());
    if name.is_empty() { None } else { Some(name) }
}

/// Output name for a trimmed copy: `{stem}_CUT_{timestamp}{ext}`.
///
/// Second-granular timestamps mean two trims of the same source within the
/// same second collide and the later one overwrites the earlier.
pub fn trimmed_name(source: &str, at: DateTime<Utc>) -> String {
    let stamp = at.format("%Y%m%d%H%M%S");
    match source.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}_CUT_{stamp}.{ext}"),
        None => format!("{source}_CUT_{stamp}"),
    }
}

/// Everything that can send an upload back to the form. The `Display`
/// strings are shown to the user as one-shot messages.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UploadRejection {
    #[error("Select a video file first")]
    NoFile,
    #[error("Only .mp4 files are accepted")]
    DisallowedExtension,
    #[error("Start and end must be numbers, in seconds")]
    InvalidTimes,
    #[error("End must be greater than start")]
    EmptyWindow,
    #[error("Could not read the uploaded form")]
    MalformedBody,
    #[error("Could not store the uploaded file")]
    Storage,
}

/// Parse the `start`/`end` form fields into a trim window.
pub fn parse_window(
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(f64, f64), UploadRejection> {
    let number = |raw: Option<&str>| {
        raw.and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
    };

    let (Some(start), Some(end)) = (number(start), number(end)) else {
        return Err(UploadRejection::InvalidTimes);
    };
    if end <= start {
        return Err(UploadRejection::EmptyWindow);
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn extension_allow_list() {
        assert!(allowed_extension("clip.mp4"));
        assert!(allowed_extension("CLIP.MP4"));
        assert!(allowed_extension("archive.tar.mp4"));
        assert!(!allowed_extension("clip.mov"));
        assert!(!allowed_extension("clip.mp4.txt"));
        assert!(!allowed_extension("mp4"));
        assert!(!allowed_extension(""));
    }

    #[test]
    fn sanitizes_hostile_names() {
        let name = sanitize_upload_name("../../etc/passwd.mp4").unwrap();
        assert!(!name.contains('/'));
        assert!(!name.contains('\\'));
        assert_eq!(sanitize_upload_name("  "), None);
        assert_eq!(sanitize_upload_name("clip.mp4").as_deref(), Some("clip.mp4"));
    }

    #[test]
    fn trimmed_name_keeps_stem_and_extension() {
        let at = Utc.with_ymd_and_hms(2026, 8, 7, 12, 30, 5).unwrap();
        assert_eq!(trimmed_name("clip.mp4", at), "clip_CUT_20260807123005.mp4");
    }

    #[test]
    fn trimmed_name_collides_within_one_second() {
        // Known defect: second-granular stamps mean the later of two trims
        // started in the same second overwrites the earlier one.
        let at = Utc.with_ymd_and_hms(2026, 8, 7, 12, 30, 5).unwrap();
        assert_eq!(trimmed_name("clip.mp4", at), trimmed_name("clip.mp4", at));
    }

    #[test]
    fn window_requires_two_finite_numbers() {
        assert_eq!(parse_window(Some("0"), Some("5")), Ok((0.0, 5.0)));
        assert_eq!(parse_window(Some(" 1.5 "), Some("8")), Ok((1.5, 8.0)));
        assert_eq!(
            parse_window(None, Some("5")),
            Err(UploadRejection::InvalidTimes)
        );
        assert_eq!(
            parse_window(Some("abc"), Some("5")),
            Err(UploadRejection::InvalidTimes)
        );
        assert_eq!(
            parse_window(Some("inf"), Some("5")),
            Err(UploadRejection::InvalidTimes)
        );
    }

    #[test]
    fn window_rejects_end_at_or_before_start() {
        assert_eq!(
            parse_window(Some("5"), Some("5")),
            Err(UploadRejection::EmptyWindow)
        );
        assert_eq!(
            parse_window(Some("8"), Some("2")),
            Err(UploadRejection::EmptyWindow)
        );
    }
}
