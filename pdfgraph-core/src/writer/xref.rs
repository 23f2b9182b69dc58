//! Classic cross-reference section (ISO 32000-1 Section 7.5.4)

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Record {
    value: u64,
    generation: u16,
    in_use: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Subsection {
    first: u32,
    records: Vec<Record>,
}

/// Accumulates entries in ascending object-number order; a gap in the
/// numbering opens a new subsection.
#[derive(Debug, Clone, Default)]
pub struct XRefSectionBuilder {
    subsections: Vec<Subsection>,
    last: Option<u32>,
}

impl XRefSectionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_in_use(&mut self, number: u32, offset: u64, generation: u16) {
        self.push(
            number,
            Record {
                value: offset,
                generation,
                in_use: true,
            },
        );
    }

    pub fn add_free(&mut self, number: u32, next_free: u32, generation: u16) {
        self.push(
            number,
            Record {
                value: next_free as u64,
                generation,
                in_use: false,
            },
        );
    }

    fn push(&mut self, number: u32, record: Record) {
        assert!(
            self.last.map_or(true, |last| number > last),
            "xref entries must be added in ascending order"
        );
        match self.subsections.last_mut() {
            Some(subsection) if self.last.map(|last| last + 1) == Some(number) => {
                subsection.records.push(record)
            }
            _ => self.subsections.push(Subsection {
                first: number,
                records: vec![record],
            }),
        }
        self.last = Some(number);
    }

    pub fn subsection_count(&self) -> usize {
        self.subsections.len()
    }

    /// One past the highest object number added.
    pub fn size(&self) -> u32 {
        self.last.map_or(0, |last| last + 1)
    }

    /// `xref`, then each `first count` header and its 20-byte records.
    pub fn render(&self) -> Vec<u8> {
        let mut out = b"xref\n".to_vec();
        for subsection in &self.subsections {
            out.extend_from_slice(
                format!("{} {}\n", subsection.first, subsection.records.len()).as_bytes(),
            );
            for record in &subsection.records {
                let kind = if record.in_use { 'n' } else { 'f' };
                out.extend_from_slice(
                    format!("{:010} {:05} {} \n", record.value, record.generation, kind).as_bytes(),
                );
            }
        }
        out
    }
}
