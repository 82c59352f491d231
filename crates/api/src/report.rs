//! CSV export of event listings.

use civic_db::models::event::Event;

/// Column order of the export.
pub const REPORT_HEADER: [&str; 8] = [
    "id",
    "name",
    "category",
    "status",
    "progress",
    "address",
    "point",
    "created_at",
];

/// Render `events` as CSV with a header row. Lines end in CRLF.
pub fn render_csv(events: &[Event]) -> String {
    let mut out = String::new();
    push_row(&mut out, REPORT_HEADER.iter().copied());

    for event in events {
        let id = event.id.to_string();
        let point = event.point.to_string();
        let created_at = event.created_at.to_rfc3339();
        push_row(
            &mut out,
            [
                id.as_str(),
                event.name.as_deref().unwrap_or_default(),
                event.category.as_str(),
                event.status.as_str(),
                event.progress.as_str(),
                event.address.as_deref().unwrap_or_default(),
                point.as_str(),
                created_at.as_str(),
            ],
        );
    }
    out
}

fn push_row<'a>(out: &mut String, cells: impl IntoIterator<Item = &'a str>) {
    for (i, cell) in cells.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        push_cell(out, cell);
    }
    out.push_str("\r\n");
}

fn push_cell(out: &mut String, cell: &str) {
    if !cell.contains([',', '"', '\n', '\r']) {
        out.push_str(cell);
        return;
    }
    out.push('"');
    out.push_str(&cell.replace('"', "\"\""));
    out.push('"');
}
