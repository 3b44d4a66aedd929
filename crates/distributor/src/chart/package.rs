use flate2::Compression;
use flate2::write::GzEncoder;
use tar::{Builder, Header};

use super::ChartError;
use super::render::Chart;

/// Pack `chart` into a gzip-compressed tar rooted at the chart name.
///
/// Entries carry a zero mtime so the same chart always packs to the same
/// bytes.
pub fn package(chart: &Chart) -> Result<Vec<u8>, ChartError> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = Builder::new(encoder);
    for (path, content) in chart.files() {
        let mut header = Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        builder
            .append_data(
                &mut header,
                format!("{}/{path}", chart.meta.name),
                content.as_bytes(),
            )
            .map_err(|e| ChartError::Package(format!("{path}: {e}")))?;
    }
    builder
        .into_inner()
        .and_then(GzEncoder::finish)
        .map_err(|e| ChartError::Package(e.to_string()))
}
