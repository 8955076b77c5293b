//! Built-in value generators.

use super::kinds::{GeneratorKind, Params};
use super::timestamp::TimeBound;
use super::{GenerationContext, ValueGenerator};
use crate::error::DrawError;
use crate::value::Value;
use chrono::format::{Item, StrftimeItems};
use chrono::DateTime;
use fake::faker::address::en::{CityName, StreetName, ZipCode};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::lorem::en::{Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::seq::IndexedRandom;
use rand::Rng;

const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Build the generator for a random (non-sequence, non-foreign) kind
pub fn build_builtin(
    kind: GeneratorKind,
    params: &Params,
) -> Result<Box<dyn ValueGenerator>, String> {
    let generator: Box<dyn ValueGenerator> = match kind {
        GeneratorKind::Integer => Box::new(IntegerGenerator::from_params(params)?),
        GeneratorKind::Decimal => Box::new(DecimalGenerator::from_params(params)?),
        GeneratorKind::Timestamp => Box::new(TimestampGenerator::from_params(params)?),
        GeneratorKind::String => Box::new(StringGenerator::from_params(params)?),
        GeneratorKind::Alphanumeric => Box::new(CharsetGenerator::alphanumeric(params)?),
        GeneratorKind::OneOf => Box::new(OneOfGenerator::from_params(params)?),
        GeneratorKind::Boolean => Box::new(BooleanGenerator::from_params(params)?),
        GeneratorKind::Binary => Box::new(BinaryGenerator::from_params(params)?),
        GeneratorKind::Sentence => Box::new(SentenceGenerator::from_params(params)?),
        GeneratorKind::Uuid
        | GeneratorKind::Ipv4
        | GeneratorKind::Name
        | GeneratorKind::FirstName
        | GeneratorKind::LastName
        | GeneratorKind::Email
        | GeneratorKind::Username
        | GeneratorKind::PhoneNumber
        | GeneratorKind::Company
        | GeneratorKind::City
        | GeneratorKind::Street
        | GeneratorKind::Zip
        | GeneratorKind::Word => Box::new(TextGenerator { kind }),
        GeneratorKind::Sequence | GeneratorKind::Foreign => {
            return Err(format!("{} is not a random generator", kind))
        }
    };
    Ok(generator)
}

fn length_range(params: &Params, min: usize, max: usize) -> Result<(usize, usize), String> {
    let min = params.usize_or("min", min)?;
    let max = params.usize_or("max", max)?;
    if min > max {
        return Err(format!("min ({}) is greater than max ({})", min, max));
    }
    Ok((min, max))
}

/// Inclusive integer range
#[derive(Debug, Clone)]
pub struct IntegerGenerator {
    min: i64,
    max: i64,
}

impl IntegerGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let min = params.i64_or("min", 0)?;
        let max = params.i64_or("max", 100_000)?;
        if min > max {
            return Err(format!("min ({}) is greater than max ({})", min, max));
        }
        Ok(Self { min, max })
    }
}

impl ValueGenerator for IntegerGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        Ok(Value::Int(ctx.rng.random_range(self.min..=self.max)))
    }
}

/// Float in a range, or a random integer of `maxdigits` digits, scaled
/// down by `precision` decimal places
#[derive(Debug, Clone)]
pub struct DecimalGenerator {
    min: f64,
    max: f64,
    precision: u32,
    maxdigits: Option<u32>,
}

impl DecimalGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let min = params.f64_or("min", 0.0)?;
        let max = params.f64_or("max", 100_000.0)?;
        if !min.is_finite() || !max.is_finite() || !(max - min).is_finite() {
            return Err(format!("range {}..{} is not finite", min, max));
        }
        if min > max {
            return Err(format!("min ({}) is greater than max ({})", min, max));
        }
        let precision = params.opt_u32("precision")?.unwrap_or(3).min(15);
        let maxdigits = params.opt_u32("maxdigits")?.map(|d| d.clamp(1, 18));
        Ok(Self {
            min,
            max,
            precision,
            maxdigits,
        })
    }
}

impl ValueGenerator for DecimalGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let scale = 10f64.powi(self.precision as i32);
        let value = match self.maxdigits {
            Some(digits) => {
                let upper = 10i64.pow(digits);
                ctx.rng.random_range(0..upper) as f64 / scale
            }
            None => {
                let raw = ctx.rng.random_range(self.min..=self.max);
                (raw * scale).round() / scale
            }
        };
        Ok(Value::Float(value))
    }
}

/// Formatted instant in a window relative to the context anchor
#[derive(Debug, Clone)]
pub struct TimestampGenerator {
    start: TimeBound,
    end: TimeBound,
    format: String,
}

impl TimestampGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let start = TimeBound::parse(params.str_or("start", "-30d")?)?;
        let end = TimeBound::parse(params.str_or("end", "now")?)?;
        let format = params.str_or("format", "%Y-%m-%d %H:%M:%S")?.to_string();
        if StrftimeItems::new(&format).any(|item| matches!(item, Item::Error)) {
            return Err(format!("invalid timestamp format: {}", format));
        }
        Ok(Self { start, end, format })
    }
}

impl ValueGenerator for TimestampGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let mut start = self.start.resolve(ctx.anchor).and_utc().timestamp();
        let mut end = self.end.resolve(ctx.anchor).and_utc().timestamp();
        if start > end {
            std::mem::swap(&mut start, &mut end);
        }
        let secs = ctx.rng.random_range(start..=end);
        let instant = DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or(ctx.anchor);
        Ok(Value::Text(instant.format(&self.format).to_string()))
    }
}

/// Uppercase text of random length, or a `#`/`?` pattern
#[derive(Debug, Clone)]
pub struct StringGenerator {
    min: usize,
    max: usize,
    pattern: Option<String>,
}

impl StringGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let (min, max) = length_range(params, 1, 16)?;
        let pattern = params.opt_str("pattern")?.map(str::to_string);
        Ok(Self { min, max, pattern })
    }
}

impl ValueGenerator for StringGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let text = match &self.pattern {
            Some(pattern) => pattern
                .chars()
                .map(|c| match c {
                    '#' => char::from(b'0' + ctx.rng.random_range(0..10u8)),
                    '?' => char::from(UPPERCASE[ctx.rng.random_range(0..UPPERCASE.len())]),
                    other => other,
                })
                .collect(),
            None => random_chars(ctx, UPPERCASE, self.min, self.max),
        };
        Ok(Value::Text(text))
    }
}

fn random_chars(ctx: &mut GenerationContext, charset: &[u8], min: usize, max: usize) -> String {
    let len = ctx.rng.random_range(min..=max);
    (0..len)
        .map(|_| char::from(charset[ctx.rng.random_range(0..charset.len())]))
        .collect()
}

/// Random-length text drawn from a fixed character set
#[derive(Debug, Clone)]
pub struct CharsetGenerator {
    charset: &'static [u8],
    min: usize,
    max: usize,
}

impl CharsetGenerator {
    pub fn alphanumeric(params: &Params) -> Result<Self, String> {
        let (min, max) = length_range(params, 1, 16)?;
        Ok(Self {
            charset: ALPHANUMERIC,
            min,
            max,
        })
    }
}

impl ValueGenerator for CharsetGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        Ok(Value::Text(random_chars(ctx, self.charset, self.min, self.max)))
    }
}

/// Uniform pick from a list of scalars
#[derive(Debug, Clone)]
pub struct OneOfGenerator {
    items: Vec<Value>,
}

impl OneOfGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let items = match params.get("items") {
            None => vec![Value::Int(0)],
            Some(serde_yaml_ng::Value::Sequence(seq)) => seq
                .iter()
                .map(|v| Value::from_yaml(v).ok_or_else(|| format!("oneof item is not a scalar: {:?}", v)))
                .collect::<Result<Vec<_>, _>>()?,
            Some(other) => return Err(format!("parameter `items` must be a list, got {:?}", other)),
        };
        if items.is_empty() {
            return Err("parameter `items` must not be empty".to_string());
        }
        Ok(Self { items })
    }
}

impl ValueGenerator for OneOfGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        Ok(self.items.choose(&mut ctx.rng).cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
pub struct BooleanGenerator {
    chance: f64,
}

impl BooleanGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let chance = params.f64_or("chance", 0.5)?;
        if !(0.0..=1.0).contains(&chance) {
            return Err(format!("chance must be between 0 and 1, got {}", chance));
        }
        Ok(Self { chance })
    }
}

impl ValueGenerator for BooleanGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        Ok(Value::Bool(ctx.rng.random_bool(self.chance)))
    }
}

#[derive(Debug, Clone)]
pub struct BinaryGenerator {
    min: usize,
    max: usize,
}

impl BinaryGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let (min, max) = length_range(params, 1, 16)?;
        Ok(Self { min, max })
    }
}

impl ValueGenerator for BinaryGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let len = ctx.rng.random_range(self.min..=self.max);
        let bytes = (0..len).map(|_| ctx.rng.random::<u8>()).collect();
        Ok(Value::Bytes(bytes))
    }
}

/// Sentence with a word count in `min..=max`
#[derive(Debug, Clone)]
pub struct SentenceGenerator {
    min: usize,
    max: usize,
}

impl SentenceGenerator {
    pub fn from_params(params: &Params) -> Result<Self, String> {
        let (min, max) = length_range(params, 4, 10)?;
        Ok(Self { min, max })
    }
}

impl ValueGenerator for SentenceGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let text: String = Sentence(self.min..self.max + 1).fake_with_rng(&mut ctx.rng);
        Ok(Value::Text(text))
    }
}

/// Parameterless text kinds: identifiers, addresses and `fake` providers
#[derive(Debug, Clone)]
pub struct TextGenerator {
    kind: GeneratorKind,
}

impl ValueGenerator for TextGenerator {
    fn next_value(&mut self, ctx: &mut GenerationContext) -> Result<Value, DrawError> {
        let rng = &mut ctx.rng;
        let text: String = match self.kind {
            GeneratorKind::Uuid => format!(
                "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                rng.random::<u32>(),
                rng.random::<u16>(),
                (rng.random::<u16>() & 0x0FFF) | 0x4000,
                (rng.random::<u16>() & 0x3FFF) | 0x8000,
                rng.random::<u64>() & 0xFFFF_FFFF_FFFF_u64
            ),
            GeneratorKind::Ipv4 => format!(
                "{}.{}.{}.{}",
                rng.random_range(1..255),
                rng.random_range(0..256),
                rng.random_range(0..256),
                rng.random_range(1..255)
            ),
            GeneratorKind::Name => Name().fake_with_rng(rng),
            GeneratorKind::FirstName => FirstName().fake_with_rng(rng),
            GeneratorKind::LastName => LastName().fake_with_rng(rng),
            GeneratorKind::Email => SafeEmail().fake_with_rng(rng),
            GeneratorKind::Username => Username().fake_with_rng(rng),
            GeneratorKind::PhoneNumber => PhoneNumber().fake_with_rng(rng),
            GeneratorKind::Company => CompanyName().fake_with_rng(rng),
            GeneratorKind::City => CityName().fake_with_rng(rng),
            GeneratorKind::Street => StreetName().fake_with_rng(rng),
            GeneratorKind::Zip => ZipCode().fake_with_rng(rng),
            _ => Word().fake_with_rng(rng),
        };
        Ok(Value::Text(text))
    }
}
