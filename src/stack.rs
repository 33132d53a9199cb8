use crate::aggregate::DerivedRecord;

/// One stacked band point: baseline `y0` and top `y1` at `x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackPoint {
    pub x: f64,
    pub y0: f64,
    pub y1: f64,
}

/// One layer of a stack, in key order
#[derive(Debug, Clone, PartialEq)]
pub struct StackSeries {
    pub key: &'static str,
    pub points: Vec<StackPoint>,
}

/// Stack `keys` on top of each other for every record, in record order.
///
/// The first key sits on zero, each following key starts where the previous
/// one ended. Missing values contribute nothing to the stack. Records without
/// a finite `x` are skipped.
pub fn stack(
    records: &[DerivedRecord],
    keys: &[&'static str],
    x: impl Fn(&DerivedRecord) -> Option<f64>,
) -> Vec<StackSeries> {
    let mut series: Vec<StackSeries> = keys
        .iter()
        .map(|&key| StackSeries {
            key,
            points: Vec::with_capacity(records.len()),
        })
        .collect();

    for record in records {
        let Some(x) = x(record).filter(|x| x.is_finite()) else {
            continue;
        };
        let mut baseline = 0.0;
        for (layer, &key) in series.iter_mut().zip(keys) {
            let value = record.get(key);
            let top = if value.is_finite() { baseline + value } else { baseline };
            layer.points.push(StackPoint {
                x,
                y0: baseline,
                y1: top,
            });
            baseline = top;
        }
    }

    series
}

/// Highest top of the last layer
pub fn stack_max(series: &[StackSeries]) -> Option<f64> {
    series
        .last()?
        .points
        .iter()
        .map(|p| p.y1)
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Key;

    fn record(year: i32, fossil: f64, nuclear: f64, renew: f64) -> DerivedRecord {
        DerivedRecord::new(Key::Year(year))
            .with("fossil", fossil)
            .with("nuclear", nuclear)
            .with("renew", renew)
    }

    fn by_year(r: &DerivedRecord) -> Option<f64> {
        r.key.year().map(f64::from)
    }

    #[test]
    fn test_stack_offsets() {
        let records = vec![record(2000, 10.0, 2.0, 3.0), record(2001, 12.0, 0.0, 5.0)];
        let layers = stack(&records, &["fossil", "nuclear", "renew"], by_year);
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].points[0], StackPoint { x: 2000.0, y0: 0.0, y1: 10.0 });
        assert_eq!(layers[1].points[0], StackPoint { x: 2000.0, y0: 10.0, y1: 12.0 });
        assert_eq!(layers[2].points[1], StackPoint { x: 2001.0, y0: 12.0, y1: 17.0 });
        assert_eq!(stack_max(&layers), Some(17.0));
    }

    #[test]
    fn test_missing_value_adds_nothing() {
        let records = vec![record(2000, 1.0, f64::NAN, 2.0)];
        let layers = stack(&records, &["fossil", "nuclear", "renew"], by_year);
        assert_eq!(layers[1].points[0].y0, 1.0);
        assert_eq!(layers[1].points[0].y1, 1.0);
        assert_eq!(layers[2].points[0].y1, 3.0);
    }

    #[test]
    fn test_empty_stack_has_no_max() {
        let layers = stack(&[], &["fossil"], by_year);
        assert_eq!(stack_max(&layers), None);
    }
}
