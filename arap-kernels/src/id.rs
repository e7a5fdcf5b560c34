/// The ID of a mesh vertex.
/// Also the index of that vertex's slot in every per-vertex buffer.
pub type VertexId = u32;

/// Generates an incrementing sequence of IDs starting from 0.
#[derive(Default)]
pub struct IdGenerator {
    next: VertexId,
}

impl IdGenerator {
    /// Generates an incrementing sequence of IDs starting from 0.
    pub fn next_id(&mut self) -> VertexId {
        let out = self.next;
        self.next += 1;
        out
    }

    /// How many IDs have been handed out so far.
    pub fn len(&self) -> usize {
        self.next as usize
    }

    /// True if no IDs have been handed out yet.
    pub fn is_empty(&self) -> bool {
        self.next == 0
    }
}
