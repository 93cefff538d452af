//! Variable fields: attributes whose value changes across the packets of a stream.
//!
//! Every attribute carries a [`VariableField`] program. In [`FieldMode::Fixed`]
//! all packets use the attribute value. Otherwise the value is incremented,
//! decremented or randomized from one packet to the next, and restarts from the
//! initial value every `count` packets.
//!
//! The step is stored aligned on the attribute bits, so that it can be added
//! to the raw binary field directly. Accessors taking a shift convert from and
//! to the attribute unit.
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, EnumVariantNames};

use crate::record::{CounterType, VariableFieldMode, VariableFieldRecord};

/// Generation mode of an attribute.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Display,
    EnumString,
    EnumVariantNames,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    #[default]
    Fixed,
    Increment,
    Decrement,
    Random,
}

impl FieldMode {
    /// Mode of the variable-field descriptor, `None` for fixed attributes.
    pub fn to_wire(self) -> Option<VariableFieldMode> {
        match self {
            FieldMode::Fixed => None,
            FieldMode::Increment => Some(VariableFieldMode::Increment),
            FieldMode::Decrement => Some(VariableFieldMode::Decrement),
            FieldMode::Random => Some(VariableFieldMode::Random),
        }
    }
}

impl From<VariableFieldMode> for FieldMode {
    fn from(value: VariableFieldMode) -> Self {
        match value {
            VariableFieldMode::Increment => FieldMode::Increment,
            VariableFieldMode::Decrement => FieldMode::Decrement,
            VariableFieldMode::Random => FieldMode::Random,
        }
    }
}

/// The generation program of one attribute.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VariableField {
    mode: FieldMode,
    step: u64,
    count: u32,
}

impl VariableField {
    /// A fixed program with a step of one attribute unit.
    pub fn new(shift: u32) -> Self {
        VariableField {
            mode: FieldMode::Fixed,
            step: 1 << shift,
            count: 1,
        }
    }

    pub fn mode(&self) -> FieldMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: FieldMode) {
        self.mode = mode;
    }

    /// Step in attribute units.
    pub fn step(&self, shift: u32) -> u64 {
        self.step >> shift
    }

    /// Step aligned on the attribute bits.
    pub fn raw_step(&self) -> u64 {
        self.step
    }

    pub fn set_step(&mut self, step: u64, shift: u32) {
        self.step = step << shift;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn set_count(&mut self, count: u32) {
        self.count = count;
    }

    /// Build the descriptor for this program, `None` in fixed mode.
    pub fn to_record(
        &self,
        offset: u32,
        mask: u64,
        counter: CounterType,
        value: u64,
    ) -> Option<VariableFieldRecord> {
        Some(VariableFieldRecord {
            counter,
            offset,
            mask,
            value,
            mode: self.mode.to_wire()?,
            count: self.count,
            step: self.step,
        })
    }

    /// Restore the program from a descriptor.
    pub fn load_record(&mut self, record: &VariableFieldRecord) {
        self.mode = record.mode.into();
        self.count = record.count;
        self.step = record.step;
    }

    /// Values taken by a binary field over the packets of a stream.
    ///
    /// `initial` is the binary field value of the first packet and `mask` the
    /// bits driven by this program. A count of zero never restarts the sequence.
    ///
    /// ```
    /// use rand::rngs::SmallRng;
    /// use rand::SeedableRng;
    /// use ostinato_protocols::variable::{FieldMode, VariableField};
    ///
    /// let mut program = VariableField::new(4);
    /// program.set_mode(FieldMode::Increment);
    /// program.set_count(3);
    /// let values: Vec<u64> = program
    ///     .sequence(0x45, 0xf0, SmallRng::seed_from_u64(0))
    ///     .take(4)
    ///     .collect();
    /// assert_eq!(values, [0x45, 0x55, 0x65, 0x45]);
    /// ```
    pub fn sequence<R: Rng>(&self, initial: u64, mask: u64, rng: R) -> Sequence<R> {
        Sequence {
            program: *self,
            initial,
            mask,
            index: 0,
            rng,
        }
    }
}

/// Iterator over the values of a variable field, see [`VariableField::sequence`].
pub struct Sequence<R> {
    program: VariableField,
    initial: u64,
    mask: u64,
    index: u64,
    rng: R,
}

impl<R: Rng> Iterator for Sequence<R> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        let position = match self.program.count {
            0 => self.index,
            count => self.index % count as u64,
        };
        self.index += 1;
        let bits = self.initial & self.mask;
        let delta = self.program.step.wrapping_mul(position);
        let bits = match self.program.mode {
            FieldMode::Fixed => bits,
            FieldMode::Increment => bits.wrapping_add(delta),
            FieldMode::Decrement => bits.wrapping_sub(delta),
            FieldMode::Random => self.rng.gen::<u64>(),
        };
        Some((self.initial & !self.mask) | (bits & self.mask))
    }
}
