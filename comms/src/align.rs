/// Primitive types whose alignment is at least 4 bytes.
///
/// Receiving into a buffer of these guarantees that `f32` payloads can be cast in place.
pub trait Align4: bytemuck::Pod {}

impl Align4 for u32 {}
impl Align4 for i32 {}
impl Align4 for u64 {}
impl Align4 for f32 {}
impl Align4 for f64 {}
