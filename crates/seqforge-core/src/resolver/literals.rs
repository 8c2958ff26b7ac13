//! Boundary-heavy literal generation and perturbation.
//!
//! Integer literals follow the distribution ~40% exact boundaries, ~30%
//! near a boundary, ~30% uniform within `[-max_int, max_int]`. The generator
//! holds no random state; callers pass their own `Rng`.

use rand::seq::SliceRandom;
use rand::Rng;
use seqforge_types::Primitive;

use crate::config::EngineConfig;
use crate::sequence::Literal;

const BYTE_BOUNDARIES: [i64; 5] = [0, 1, -1, i8::MAX as i64, i8::MIN as i64];
const SHORT_BOUNDARIES: [i64; 5] = [0, 1, -1, i16::MAX as i64, i16::MIN as i64];
const INT_BOUNDARIES: [i64; 5] = [0, 1, -1, i32::MAX as i64, i32::MIN as i64];
const LONG_BOUNDARIES: [i64; 5] = [0, 1, -1, i64::MAX, i64::MIN];
const FLOAT_BOUNDARIES: [f64; 5] = [0.0, 1.0, -1.0, 0.5, -0.5];

/// Printable ASCII range used for chars and strings.
const PRINTABLE: std::ops::RangeInclusive<u8> = b' '..=b'~';

#[derive(Debug, Clone)]
pub struct LiteralGenerator {
    max_int: i64,
    max_delta: i64,
    max_string_length: usize,
}

impl LiteralGenerator {
    pub fn new(max_int: i64, max_delta: i64, max_string_length: usize) -> Self {
        Self {
            max_int: max_int.max(1),
            max_delta: max_delta.max(1),
            max_string_length,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_int, config.max_delta, config.max_string_length)
    }

    /// Fresh random value of `primitive`.
    pub fn generate<R: Rng + ?Sized>(&self, rng: &mut R, primitive: Primitive) -> Literal {
        match primitive {
            Primitive::Boolean => Literal::Boolean(rng.gen_bool(0.5)),
            Primitive::Char => Literal::Char(random_char(rng)),
            Primitive::Byte => Literal::Byte(self.gen_integer(
                rng,
                &BYTE_BOUNDARIES,
                i8::MIN as i64,
                i8::MAX as i64,
            ) as i8),
            Primitive::Short => Literal::Short(self.gen_integer(
                rng,
                &SHORT_BOUNDARIES,
                i16::MIN as i64,
                i16::MAX as i64,
            ) as i16),
            Primitive::Int => Literal::Int(self.gen_integer(
                rng,
                &INT_BOUNDARIES,
                i32::MIN as i64,
                i32::MAX as i64,
            ) as i32),
            Primitive::Long => {
                Literal::Long(self.gen_integer(rng, &LONG_BOUNDARIES, i64::MIN, i64::MAX))
            }
            Primitive::Float => Literal::Float(self.gen_float(rng) as f32),
            Primitive::Double => Literal::Double(self.gen_float(rng)),
            Primitive::String => Literal::String(self.gen_string(rng)),
        }
    }

    /// A nearby value of the same kind, or `None` when the literal kind has
    /// no catalog-independent neighbor (enum constants, type literals).
    pub fn perturb<R: Rng + ?Sized>(&self, rng: &mut R, literal: &Literal) -> Option<Literal> {
        let out = match literal {
            Literal::Boolean(v) => Literal::Boolean(!v),
            Literal::Char(c) => Literal::Char(shift_char(rng, *c)),
            Literal::Byte(v) => {
                Literal::Byte(self.nudge(rng, *v as i64, i8::MIN as i64, i8::MAX as i64) as i8)
            }
            Literal::Short(v) => {
                Literal::Short(self.nudge(rng, *v as i64, i16::MIN as i64, i16::MAX as i64) as i16)
            }
            Literal::Int(v) => {
                Literal::Int(self.nudge(rng, *v as i64, i32::MIN as i64, i32::MAX as i64) as i32)
            }
            Literal::Long(v) => Literal::Long(self.nudge(rng, *v, i64::MIN, i64::MAX)),
            Literal::Float(v) => Literal::Float(self.nudge_float(rng, *v as f64) as f32),
            Literal::Double(v) => Literal::Double(self.nudge_float(rng, *v)),
            Literal::String(s) => Literal::String(self.edit_string(rng, s)),
            Literal::EnumConstant(_) | Literal::Type(_) => return None,
        };
        Some(out)
    }

    // ---- Integer generation ----

    fn gen_integer<R: Rng + ?Sized>(&self, rng: &mut R, boundaries: &[i64], lo: i64, hi: i64) -> i64 {
        let tier: f64 = rng.gen();
        if tier < 0.4 {
            *boundaries.choose(rng).unwrap_or(&0)
        } else if tier < 0.7 {
            let base = *boundaries.choose(rng).unwrap_or(&0);
            let offset = rng.gen_range(1..=3i64);
            let near = if rng.gen_bool(0.5) {
                base.saturating_add(offset)
            } else {
                base.saturating_sub(offset)
            };
            near.clamp(lo, hi)
        } else {
            let bound_lo = lo.max(-self.max_int);
            let bound_hi = hi.min(self.max_int);
            rng.gen_range(bound_lo..=bound_hi)
        }
    }

    fn nudge<R: Rng + ?Sized>(&self, rng: &mut R, value: i64, lo: i64, hi: i64) -> i64 {
        let mut delta = rng.gen_range(-self.max_delta..=self.max_delta);
        if delta == 0 {
            delta = 1;
        }
        let moved = value.saturating_add(delta).clamp(lo, hi);
        if moved == value {
            value.saturating_sub(delta).clamp(lo, hi)
        } else {
            moved
        }
    }

    // ---- Floating point ----

    fn gen_float<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let tier: f64 = rng.gen();
        if tier < 0.4 {
            *FLOAT_BOUNDARIES.choose(rng).unwrap_or(&0.0)
        } else {
            let bound = self.max_int as f64;
            rng.gen_range(-bound..=bound)
        }
    }

    fn nudge_float<R: Rng + ?Sized>(&self, rng: &mut R, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }
        let scale = self.max_delta as f64;
        let mut delta = rng.gen_range(-scale..=scale) * rng.gen::<f64>();
        if delta == 0.0 {
            delta = 1.0;
        }
        let moved = value + delta;
        if moved == value {
            value + 1.0
        } else {
            moved
        }
    }

    // ---- Strings ----

    fn gen_string<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let len = rng.gen_range(0..=self.max_string_length);
        (0..len).map(|_| random_char(rng)).collect()
    }

    /// Delete, replace or insert one character.
    fn edit_string<R: Rng + ?Sized>(&self, rng: &mut R, s: &str) -> String {
        let mut chars: Vec<char> = s.chars().collect();
        let choice = if chars.is_empty() { 2 } else { rng.gen_range(0..3) };
        match choice {
            0 => {
                let at = rng.gen_range(0..chars.len());
                chars.remove(at);
            }
            1 => {
                let at = rng.gen_range(0..chars.len());
                chars[at] = shift_char(rng, chars[at]);
            }
            _ => {
                let at = rng.gen_range(0..=chars.len());
                chars.insert(at, random_char(rng));
            }
        }
        chars.into_iter().collect()
    }
}

fn random_char<R: Rng + ?Sized>(rng: &mut R) -> char {
    rng.gen_range(PRINTABLE) as char
}

fn shift_char<R: Rng + ?Sized>(rng: &mut R, c: char) -> char {
    let code = c as u32;
    let (lo, hi) = (*PRINTABLE.start() as u32, *PRINTABLE.end() as u32);
    if !(lo..=hi).contains(&code) {
        return random_char(rng);
    }
    let step = rng.gen_range(1..=3u32);
    let up = code + step <= hi;
    let down = code >= lo + step;
    let shifted = if up && (!down || rng.gen_bool(0.5)) {
        code + step
    } else {
        code - step
    };
    char::from_u32(shifted).unwrap_or(' ')
}
