/// Writes a message into a frame buffer.
pub trait Serialize<'a> {
    /// Serializes `self` by extending `buf`.
    ///
    /// # Arguments
    /// * `buf` - The frame buffer, it may already hold a prefix that must be kept.
    ///
    /// # Returns
    /// An optional trailing slice that is written right after `buf` without being copied into it.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> Option<&'a [u8]>;
}
