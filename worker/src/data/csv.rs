use std::io::Read;

use super::{DataErr, Result};

/// Dense labeled samples, `data` holds `labels.len()` rows of `features` values each.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabeledData {
    pub data: Vec<f32>,
    pub labels: Vec<f32>,
    pub features: usize,
}

impl LabeledData {
    /// The amount of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Reads a csv of labeled samples, one per row, skipping the header line.
///
/// The first field of each row is the label, the rest are the features, which get
/// multiplied by `scale`.
///
/// # Arguments
/// * `reader` - The csv source.
/// * `scale` - The factor applied to every feature.
///
/// # Returns
/// The loaded samples or an error pointing at the offending line.
pub fn load_csv<R: Read>(reader: R, scale: f32) -> Result<LabeledData> {
    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(reader);

    let mut loaded = LabeledData::default();
    let mut width = None;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |pos| pos.line());

        let mut fields = record.iter().map(|field| {
            field.parse::<f32>().map_err(|_| DataErr::Parse {
                line,
                field: field.to_string(),
            })
        });

        let Some(label) = fields.next() else {
            return Err(DataErr::EmptyRow { line });
        };

        let expected = *width.get_or_insert(record.len());
        if record.len() != expected {
            return Err(DataErr::RowWidth {
                line,
                got: record.len(),
                expected,
            });
        }

        loaded.labels.push(label?);
        for value in fields {
            loaded.data.push(value? * scale);
        }
    }

    loaded.features = width.map_or(0, |w| w - 1);
    Ok(loaded)
}
