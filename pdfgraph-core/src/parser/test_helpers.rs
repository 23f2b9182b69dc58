//! Helper functions for creating test PDFs with correct offsets

/// Assembles a file from object bodies, computing xref offsets as it goes.
pub struct TestPdf {
    bytes: Vec<u8>,
    offsets: Vec<(u32, usize)>,
}

impl TestPdf {
    pub fn new(header: &[u8]) -> Self {
        Self {
            bytes: header.to_vec(),
            offsets: Vec::new(),
        }
    }

    /// Appends `n 0 obj <body> endobj`.
    pub fn object(mut self, number: u32, body: &[u8]) -> Self {
        self.offsets.push((number, self.bytes.len()));
        self.bytes
            .extend_from_slice(format!("{number} 0 obj\n").as_bytes());
        self.bytes.extend_from_slice(body);
        self.bytes.extend_from_slice(b"\nendobj\n");
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Writes an xref section for the objects appended since the last one,
    /// the trailer entries given, `startxref` and `%%EOF`. Returns the offset
    /// of the section along with the builder.
    pub fn xref(mut self, trailer: &str) -> (Self, usize) {
        let start = self.bytes.len();
        let mut offsets = std::mem::take(&mut self.offsets);
        offsets.sort();
        let mut xref = String::from("xref\n0 1\n0000000000 65535 f \n");
        for (number, offset) in &offsets {
            xref.push_str(&format!("{number} 1\n{offset:010} 00000 n \n"));
        }
        let size = offsets.iter().map(|(n, _)| n + 1).max().unwrap_or(1);
        xref.push_str(&format!(
            "trailer\n<< /Size {size} {trailer} >>\nstartxref\n{start}\n%%EOF\n"
        ));
        self.bytes.extend_from_slice(xref.as_bytes());
        (self, start)
    }

    pub fn finish(self) -> Vec<u8> {
        self.bytes
    }
}

/// Creates a minimal valid PDF with correct xref offsets
pub fn create_minimal_pdf() -> Vec<u8> {
    TestPdf::new(b"%PDF-1.4\n")
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
        .xref("/Root 1 0 R")
        .0
        .finish()
}

/// Creates a one-page PDF whose content stream has the given declared length
pub fn create_pdf_with_content_length(content: &[u8], declared_length: usize) -> Vec<u8> {
    let mut stream = format!("<< /Length {declared_length} >>\nstream\n").into_bytes();
    stream.extend_from_slice(content);
    stream.extend_from_slice(b"\nendstream");

    TestPdf::new(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n")
        .object(1, b"<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            b"<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R >>",
        )
        .object(4, &stream)
        .xref("/Root 1 0 R")
        .0
        .finish()
}

/// Creates a PDF with one incremental update that replaces the catalog
pub fn create_incremental_pdf() -> Vec<u8> {
    let (base, first_xref) = TestPdf::new(b"%PDF-1.4\n")
        .object(1, b"<< /Type /Catalog /Pages 2 0 R /Version /1.4 >>")
        .object(2, b"<< /Type /Pages /Kids [] /Count 0 >>")
        .xref("/Root 1 0 R");
    base.object(1, b"<< /Type /Catalog /Pages 2 0 R /Version /1.6 >>")
        .object(3, b"(added)")
        .xref(&format!("/Root 1 0 R /Prev {first_xref}"))
        .0
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_pdf_structure() {
        let pdf = create_minimal_pdf();
        assert!(pdf.starts_with(b"%PDF-1.4\n"));
        assert!(pdf.ends_with(b"%%EOF\n"));

        let pdf_str = String::from_utf8_lossy(&pdf);
        assert!(pdf_str.contains("xref"));
        assert!(pdf_str.contains("startxref"));
    }

    #[test]
    fn test_offsets_point_at_objects() {
        let pdf = create_minimal_pdf();
        let text = String::from_utf8_lossy(&pdf);
        let offset = text.find("2 0 obj").unwrap();
        assert!(text.contains(&format!("{offset:010} 00000 n")));
    }
}
