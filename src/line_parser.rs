use crate::io_struct::InferenceChunk;

/// Reassembles newline-delimited JSON records from arbitrarily split chunks.
///
/// The trailing partial line of each chunk is kept as residue and prepended
/// to the next one. Residue is held as raw bytes so a multi-byte character
/// split across two chunks is only decoded once both halves arrived.
/// Complete lines that fail to decode are dropped and counted.
#[derive(Debug, Default)]
pub struct LineParser {
    residue: Vec<u8>,
    discarded: u64,
}

impl LineParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every record completed by it, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<InferenceChunk> {
        // The residue never holds a newline, so only the new bytes are searched.
        let offset = self.residue.len();
        self.residue.extend_from_slice(chunk);
        let Some(pos) = chunk.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };
        let last_newline = offset + pos;

        let tail = self.residue.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.residue, tail);

        let mut records = Vec::new();
        for line in complete.split(|b| *b == b'\n') {
            if let Some(record) = self.decode(line) {
                records.push(record);
            }
        }
        records
    }

    /// Flushes the residue at end of stream. A residue that does not decode is dropped.
    pub fn finish(&mut self) -> Option<InferenceChunk> {
        let residue = std::mem::take(&mut self.residue);
        self.decode(&residue)
    }

    /// Number of non-blank lines dropped because they were not valid records.
    pub fn discarded(&self) -> u64 {
        self.discarded
    }

    pub fn residue_len(&self) -> usize {
        self.residue.len()
    }

    fn decode(&mut self, line: &[u8]) -> Option<InferenceChunk> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }
        match InferenceChunk::from_line(line) {
            Ok(record) => Some(record),
            Err(e) => {
                self.discarded += 1;
                log::debug!(
                    "Discarding malformed backend line ({} bytes): {}",
                    line.len(),
                    e
                );
                None
            }
        }
    }
}
