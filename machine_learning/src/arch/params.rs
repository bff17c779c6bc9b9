use std::ops::Range;

/// Whether a parameter array is a weight or a bias, initializers treat them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Weight,
    Bias,
}

/// A named parameter array of a layer, before it gets a place in the flat buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub shape: Vec<usize>,
    pub kind: ParamKind,
}

impl ParamSpec {
    pub fn weight(name: String, shape: Vec<usize>) -> Self {
        Self {
            name,
            shape,
            kind: ParamKind::Weight,
        }
    }

    pub fn bias(name: String, shape: Vec<usize>) -> Self {
        Self {
            name,
            shape,
            kind: ParamKind::Bias,
        }
    }

    /// The amount of scalars in this array.
    pub fn len(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fan in and fan out of a weight array laid out as `(out, in, *kernel)`.
    pub fn fans(&self) -> (usize, usize) {
        let receptive: usize = self.shape.iter().skip(2).product();
        let fan_out = self.shape.first().copied().unwrap_or(1) * receptive;
        let fan_in = self.shape.get(1).copied().unwrap_or(1) * receptive;
        (fan_in, fan_out)
    }
}

/// A parameter array placed inside the flat parameter buffer of a network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSlot {
    pub spec: ParamSpec,
    pub offset: usize,
}

impl ParamSlot {
    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn shape(&self) -> &[usize] {
        &self.spec.shape
    }

    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.spec.len()
    }
}

/// The ordered list of parameter arrays of a network and where each one lives in the flat
/// buffer. The index of a slot is the key it's stored under in a key-value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamLayout {
    slots: Vec<ParamSlot>,
    size: usize,
}

impl ParamLayout {
    /// Lays out the given arrays one after the other.
    ///
    /// # Arguments
    /// * `specs` - The parameter arrays in the order the network consumes them.
    ///
    /// # Returns
    /// A new `ParamLayout` instance.
    pub fn new<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = ParamSpec>,
    {
        let mut size = 0;
        let slots = specs
            .into_iter()
            .map(|spec| {
                let offset = size;
                size += spec.len();
                ParamSlot { spec, offset }
            })
            .collect();

        Self { slots, size }
    }

    /// The total amount of parameters.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ParamSlot] {
        &self.slots
    }

    pub fn get(&self, key: usize) -> Option<&ParamSlot> {
        self.slots.get(key)
    }

    /// Finds the key of the array with the given name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.slots.iter().position(|slot| slot.name() == name)
    }

    /// Gives the portion of `buf` belonging to the array under `key`.
    pub fn view<'a>(&self, key: usize, buf: &'a [f32]) -> Option<&'a [f32]> {
        buf.get(self.slots.get(key)?.range())
    }

    pub fn view_mut<'a>(&self, key: usize, buf: &'a mut [f32]) -> Option<&'a mut [f32]> {
        buf.get_mut(self.slots.get(key)?.range())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout() -> ParamLayout {
        ParamLayout::new([
            ParamSpec::weight("fc1_w".into(), vec![3, 2]),
            ParamSpec::bias("fc1_b".into(), vec![3]),
            ParamSpec::weight("fc2_w".into(), vec![1, 3]),
        ])
    }

    #[test]
    fn slots_are_contiguous() {
        let layout = layout();

        assert_eq!(layout.size(), 12);
        assert_eq!(layout.get(1).unwrap().range(), 6..9);
        assert_eq!(layout.position("fc2_w"), Some(2));
        assert_eq!(layout.position("nope"), None);
    }

    #[test]
    fn views_select_the_slot() {
        let layout = layout();
        let mut buf: Vec<f32> = (0..12).map(|i| i as f32).collect();

        assert_eq!(layout.view(1, &buf).unwrap(), [6., 7., 8.]);
        layout.view_mut(2, &mut buf).unwrap().fill(0.);
        assert_eq!(&buf[9..], [0.; 3]);
        assert!(layout.view(3, &buf).is_none());
    }

    #[test]
    fn conv_fans_include_the_kernel() {
        let spec = ParamSpec::weight("conv1_w".into(), vec![20, 1, 5, 5]);
        assert_eq!(spec.fans(), (25, 500));
    }
}
