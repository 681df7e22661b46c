//! Embedded browser pages: upload form and results dashboard.

use axum::response::Html;

pub async fn upload_page() -> Html<&'static str> {
    Html(UPLOAD_PAGE_HTML)
}

pub async fn dashboard_page() -> Html<&'static str> {
    Html(DASHBOARD_PAGE_HTML)
}

// ---------------------------------------------------------------------------

const UPLOAD_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>LabSight | Upload a lab report</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
      background: #fafaf9; color: #1c1917;
      min-height: 100vh; display: flex; flex-direction: column;
      align-items: center; justify-content: center; padding: 24px;
    }
    h1 { font-size: 24px; margin-bottom: 8px; }
    p { color: #78716c; font-size: 14px; margin-bottom: 24px; text-align: center; }
    .actions { display: flex; flex-direction: column; gap: 12px; width: 100%; max-width: 320px; }
    .btn {
      display: flex; align-items: center; justify-content: center;
      padding: 16px; border-radius: 12px; font-size: 16px; font-weight: 500;
      cursor: pointer; border: none; min-height: 56px; width: 100%;
    }
    .btn-primary { background: #4a7c59; color: white; }
    .btn-secondary { background: white; color: #44403c; border: 1px solid #d6d3d1; text-decoration: none; }
    .btn:disabled { opacity: 0.5; cursor: not-allowed; }
    .status { margin-top: 24px; text-align: center; }
    .status.success { color: #16a34a; }
    .status.error { color: #dc2626; }
    #file-input { display: none; }
  </style>
</head>
<body>
  <h1>LabSight</h1>
  <p>Choose a lab report (PDF or photo). Results appear on the dashboard once read.</p>

  <div class="actions">
    <button class="btn btn-primary" id="btn-file">Choose a report</button>
    <a class="btn btn-secondary" href="/dashboard">Open dashboard</a>
  </div>

  <input type="file" id="file-input" accept="image/*,application/pdf">
  <div class="status" id="status"></div>

  <script>
    var btnFile = document.getElementById('btn-file');
    var fileInput = document.getElementById('file-input');
    var statusEl = document.getElementById('status');

    function setStatus(text, kind) {
      statusEl.textContent = text;
      statusEl.className = 'status ' + (kind || '');
    }

    function poll(jobId) {
      fetch('/api/status/' + jobId)
        .then(function(r) { return r.json(); })
        .then(function(s) {
          if (s.status === 'completed') {
            setStatus(s.from_cache ? 'Already read earlier. See the dashboard.' : 'Done. See the dashboard.', 'success');
            btnFile.disabled = false;
          } else if (s.status === 'error') {
            setStatus('Could not read this report: ' + (s.error ? s.error.detail : 'unknown error'), 'error');
            btnFile.disabled = false;
          } else {
            setStatus('Reading report (' + s.status + ')...');
            setTimeout(function() { poll(jobId); }, 1000);
          }
        })
        .catch(function() { setTimeout(function() { poll(jobId); }, 2000); });
    }

    btnFile.addEventListener('click', function() { fileInput.click(); });

    fileInput.addEventListener('change', function() {
      if (!fileInput.files.length) return;
      var form = new FormData();
      form.append('file', fileInput.files[0]);
      btnFile.disabled = true;
      setStatus('Uploading...');
      fetch('/api/upload', { method: 'POST', body: form })
        .then(function(r) { return r.json().then(function(b) { return { ok: r.ok, body: b }; }); })
        .then(function(res) {
          if (!res.ok) {
            setStatus(res.body.error ? res.body.error.message : 'Upload failed', 'error');
            btnFile.disabled = false;
            return;
          }
          poll(res.body.job_id);
        })
        .catch(function() { setStatus('Upload failed', 'error'); btnFile.disabled = false; });
      fileInput.value = '';
    });
  </script>
</body>
</html>
"#;

const DASHBOARD_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>LabSight | Recent reports</title>
  <style>
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', system-ui, sans-serif;
      background: #fafaf9; color: #1c1917; padding: 24px; max-width: 960px; margin: 0 auto;
    }
    h1 { font-size: 24px; margin-bottom: 16px; }
    h2 { font-size: 18px; margin: 16px 0 8px; }
    h3 { font-size: 14px; color: #78716c; margin: 12px 0 4px; text-transform: uppercase; }
    .report { background: white; border: 1px solid #e7e5e4; border-radius: 12px; padding: 16px; margin-bottom: 16px; }
    .meta { color: #78716c; font-size: 13px; }
    table { width: 100%; border-collapse: collapse; font-size: 14px; }
    td, th { text-align: left; padding: 6px 8px; border-bottom: 1px solid #f5f5f4; }
    tr.abnormal td { color: #dc2626; font-weight: 600; }
    .toolbar { display: flex; gap: 12px; margin-bottom: 16px; }
    .toolbar a, .toolbar button {
      padding: 8px 14px; border-radius: 8px; border: 1px solid #d6d3d1;
      background: white; color: #44403c; font-size: 14px; cursor: pointer; text-decoration: none;
    }
    .empty { color: #78716c; }
  </style>
</head>
<body>
  <h1>Recent reports</h1>
  <div class="toolbar">
    <a href="/">Upload</a>
    <button id="btn-scan">Rescan uploads folder</button>
  </div>
  <div id="reports"><p class="empty">Loading...</p></div>

  <script>
    var container = document.getElementById('reports');

    function text(tag, value, cls) {
      var el = document.createElement(tag);
      el.textContent = value;
      if (cls) el.className = cls;
      return el;
    }

    function renderRange(range) {
      if (!range) return '';
      if (range.kind === 'interval') {
        if (range.low != null && range.high != null) return range.low + ' - ' + range.high;
        if (range.high != null) return '< ' + range.high;
        if (range.low != null) return '> ' + range.low;
      }
      if (range.kind === 'categorical') return range.normal.join(' / ');
      return range.text || '';
    }

    function renderReport(report) {
      var card = document.createElement('div');
      card.className = 'report';
      card.appendChild(text('h2', report.filename));
      var stats = report.ocr_data.report_summary;
      card.appendChild(text('p', report.uploaded_at + ' | ' + report.page_count + ' page(s) | ' +
        stats.total_tests + ' tests, ' + stats.abnormal_count + ' abnormal', 'meta'));

      var groups = report.ocr_data.test_results.by_category;
      Object.keys(groups).forEach(function(category) {
        card.appendChild(text('h3', category));
        var table = document.createElement('table');
        groups[category].forEach(function(r) {
          var row = document.createElement('tr');
          if (r.is_abnormal) row.className = 'abnormal';
          row.appendChild(text('td', r.test_name));
          var sign = r.comparator === 'less_than' ? '<' : r.comparator === 'greater_than' ? '>' : '';
          row.appendChild(text('td', sign + r.value + ' ' + (r.unit || '')));
          row.appendChild(text('td', r.reference_range_text || renderRange(r.reference_range)));
          table.appendChild(row);
        });
        card.appendChild(table);
      });
      return card;
    }

    function load() {
      fetch('/api/reports/recent')
        .then(function(r) { return r.json(); })
        .then(function(body) {
          container.innerHTML = '';
          if (!body.reports.length) {
            container.appendChild(text('p', 'No reports yet.', 'empty'));
            return;
          }
          body.reports.forEach(function(report) { container.appendChild(renderReport(report)); });
        })
        .catch(function() { container.innerHTML = ''; container.appendChild(text('p', 'Could not load reports.', 'empty')); });
    }

    document.getElementById('btn-scan').addEventListener('click', function() {
      fetch('/api/scan', { method: 'POST' }).then(function() { setTimeout(load, 1500); });
    });

    load();
  </script>
</body>
</html>
"#;
