/// Range clamping for pass parameters.
///
/// Descriptors come from a front end that may send out-of-range values (old
/// versions, hand-edited JSON). Instead of rejecting the job, each bounded
/// field is pulled back into its documented range and the change recorded.
use super::types::{ParamClamp, PassKind, Range, Value};

/// Clamp a value to a valid range, returning the clamped value if it was out of range
///
/// # Returns
/// * `Some(Value)` - The clamped value if it was out of range
/// * `None` - If the value was already within range
pub fn clamp_value(value: &Value, range: &Range) -> Option<Value> {
    match (value, range) {
        (Value::Int(v), Range::Int { min, max }) => {
            let clamped = (*v).clamp(*min, *max);
            if clamped != *v {
                Some(Value::Int(clamped))
            } else {
                None
            }
        }
        (Value::Float(v), Range::Float { min, max }) => {
            if v.is_nan() {
                return Some(Value::Float(*min));
            }
            let clamped = v.clamp(*min, *max);
            if clamped != *v {
                Some(Value::Float(clamped))
            } else {
                None
            }
        }
        // Float in int range or vice versa: nothing sensible to do
        _ => None,
    }
}

/// Parameter sets that know their own field ranges.
pub trait ClampRanges {
    /// Pull every bounded field into range, reporting changes to `clamper`.
    fn clamp_ranges(&mut self, clamper: &mut Clamper);
}

/// Collects [`ParamClamp`] records while a pass clamps its fields.
#[derive(Debug)]
pub struct Clamper {
    pass: PassKind,
    clamps: Vec<ParamClamp>,
}

impl Clamper {
    pub fn new(pass: PassKind) -> Self {
        Self {
            pass,
            clamps: Vec::new(),
        }
    }

    /// Switch the pass that subsequent records are attributed to
    pub fn set_pass(&mut self, pass: PassKind) {
        self.pass = pass;
    }

    pub fn int(&mut self, param: &'static str, value: &mut i32, min: i32, max: i32) {
        let range = Range::Int {
            min: i64::from(min),
            max: i64::from(max),
        };
        let original = Value::Int(i64::from(*value));
        if let Some(Value::Int(clamped)) = clamp_value(&original, &range) {
            // Range bounds are i32, so the clamped value fits
            *value = clamped as i32;
            self.record(param, original, Value::Int(clamped), range);
        }
    }

    pub fn opt_int(&mut self, param: &'static str, value: &mut Option<i32>, min: i32, max: i32) {
        if let Some(v) = value.as_mut() {
            self.int(param, v, min, max);
        }
    }

    pub fn float(&mut self, param: &'static str, value: &mut f64, min: f64, max: f64) {
        let range = Range::Float { min, max };
        let original = Value::Float(*value);
        if let Some(Value::Float(clamped)) = clamp_value(&original, &range) {
            *value = clamped;
            self.record(param, original, Value::Float(clamped), range);
        }
    }

    pub fn opt_float(&mut self, param: &'static str, value: &mut Option<f64>, min: f64, max: f64) {
        if let Some(v) = value.as_mut() {
            self.float(param, v, min, max);
        }
    }

    fn record(&mut self, param: &'static str, original: Value, clamped: Value, range: Range) {
        let clamp = ParamClamp {
            pass: self.pass,
            param,
            original,
            clamped,
            range,
        };
        tracing::warn!("{}", clamp);
        self.clamps.push(clamp);
    }

    pub fn finish(self) -> Vec<ParamClamp> {
        self.clamps
    }
}
