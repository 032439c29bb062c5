//! Inline-rendered HTML for the upload form and result players.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

/// Characters escaped when a filename becomes a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'#')
    .add(b'?')
    .add(b'{')
    .add(b'}')
    .add(b'%')
    .add(b'/')
    .add(b'\\');

fn html_escape(s: &str) -> String {
    htmlescape::encode_minimal(s)
}

fn encode_segment(s: &str) -> String {
    utf8_percent_encode(s, PATH_SEGMENT).to_string()
}

/// The single page of the service: flash message, upload form, and players
/// for the original and processed files when their names are known.
pub fn render_index(
    flash: Option<&str>,
    original: Option<&str>,
    processed: Option<&str>,
    job: Option<&str>,
) -> String {
    let flash_html = flash
        .map(|m| format!("<p class=\"flash\">{}</p>", html_escape(m)))
        .unwrap_or_default();

    let original_html = original
        .map(|name| {
            format!(
                r#"<div class="card">
    <h2>Original: {}</h2>
    <video controls src="/media/uploads/{}"></video>
  </div>"#,
                html_escape(name),
                encode_segment(name)
            )
        })
        .unwrap_or_default();

    let processed_html = processed
        .map(|name| {
            format!(
                r#"<div class="card">
    <h2>Trimmed: {}</h2>
    <video id="processed-player" controls src="/media/processed/{}"></video>
    <div><a class="btn" href="/media/processed/{}" download>Download</a></div>
  </div>"#,
                html_escape(name),
                encode_segment(name),
                encode_segment(name)
            )
        })
        .unwrap_or_default();

    let job_html = job
        .map(|id| {
            format!(
                r#"<p class="hint" id="job-status" data-job="{}">Trim job {} queued&hellip;</p>"#,
                encode_segment(id),
                html_escape(id)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!doctype html>
<html lang="en"><head>
  <meta charset="utf-8"><title>Video Trimmer</title>
  <meta name="viewport" content="width=device-width,initial-scale=1">
  <style>
    body{{font-family:system-ui,-apple-system,Segoe UI,Roboto,Arial;color:#222;padding:24px;max-width:900px;margin:auto}}
    .card{{border:1px solid #ddd;border-radius:12px;padding:18px;margin:12px 0;background:#fff}}
    label{{display:block;margin:10px 0 6px;font-weight:600}}
    input[type=file],input[type=number]{{padding:10px;border:1px solid #ccc;border-radius:8px;width:100%}}
    button{{padding:12px 18px;border:0;border-radius:10px;background:#111;color:#fff;font-weight:700;cursor:pointer}}
    button:hover{{opacity:.9}}
    .hint{{color:#666;font-size:.9em}}
    .flash{{color:#b00;font-weight:600}}
    video{{width:100%;max-height:480px;border-radius:12px;border:1px solid #ddd;background:#000}}
    a.btn{{display:inline-block;margin-top:12px;padding:12px 18px;background:#111;color:#fff;text-decoration:none;border-radius:10px;font-weight:700}}
  </style>
</head><body>
  <h1>Video Trimmer</h1>
  {flash_html}
  {job_html}

  <form class="card" method="post" enctype="multipart/form-data" action="/upload">
    <label>Video (MP4)</label>
    <input type="file" name="file" accept="video/mp4">
    <label>Start (seconds)</label>
    <input type="number" name="start" step="0.1" min="0" value="0">
    <label>End (seconds)</label>
    <input type="number" name="end" step="0.1" min="0">
    <button type="submit">Trim</button>
    <p class="hint">The clip is re-encoded, so the cut lands exactly on your timestamps.</p>
  </form>

  {original_html}
  {processed_html}

<script>
(function () {{
  var status = document.getElementById('job-status');
  if (!status) return;
  var poll = setInterval(function () {{
    fetch('/jobs/' + status.dataset.job)
      .then(function (res) {{ return res.ok ? res.json() : null; }})
      .then(function (job) {{
        if (!job) return;
        if (job.state === 'done') {{
          clearInterval(poll);
          status.textContent = 'Trim finished.';
          var player = document.getElementById('processed-player');
          if (player) player.load();
        }} else if (job.state === 'failed') {{
          clearInterval(poll);
          status.textContent = 'Trim failed: ' + (job.error || 'unknown error');
        }} else {{
          status.textContent = 'Trim job ' + job.id + ' ' + job.state + '…';
        }}
      }});
  }}, 2000);
}})();
</script>
</body></html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_always_carries_the_form() {
        let page = render_index(None, None, None, None);
        assert!(page.contains("<form"));
        assert!(page.contains("name=\"file\""));
        assert!(page.contains("name=\"start\""));
        assert!(page.contains("name=\"end\""));
        assert!(!page.contains("id=\"processed-player\""));
    }

    #[test]
    fn players_reference_both_media_folders() {
        let page = render_index(
            None,
            Some("clip.mp4"),
            Some("clip_CUT_20260807123005.mp4"),
            Some("clip_CUT_20260807123005"),
        );
        assert!(page.contains("/media/uploads/clip.mp4"));
        assert!(page.contains("/media/processed/clip_CUT_20260807123005.mp4"));
        assert!(page.contains("Trim job clip_CUT_20260807123005"));
    }

    #[test]
    fn interpolated_names_are_escaped() {
        let page = render_index(Some("<script>x</script>"), Some("a<b>.mp4"), None, None);
        assert!(!page.contains("<script>x</script>"));
        assert!(page.contains("&lt;script&gt;"));
        assert!(page.contains("a&lt;b&gt;.mp4"));
    }
}
