//! Static descriptions of protocol attributes.
//!
//! Every protocol declares an ordered table of [`FieldSpec`]s. A descriptor
//! binds a user-facing attribute (e.g. `header_length`) to the bits it occupies
//! in a binary field of the wire record (e.g. the low nibble of `ver_hdrlen`).
//! Descriptors are typed by the protocol they belong to, so that an IPv4
//! attribute cannot be read from a TCP header:
//!
//! ```compile_fail
//! use ostinato_protocols::models::{ipv4, Tcp};
//! use ostinato_protocols::Attributes;
//!
//! let tcp = Tcp::default();
//! tcp.get(ipv4::TTL);
//! ```
use std::collections::HashSet;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use crate::codec::{max_value, shift_of};
use crate::record::CounterType;

/// How the bits of an attribute are exposed to users.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// A plain unsigned integer.
    Integer,
    /// A 48-bit MAC address with its own generation program.
    Mac,
    /// A 32-bit IPv4 address with its own generation program.
    Ipv4,
}

/// A protocol with a static attribute table.
pub trait ProtocolSpec: Sized + 'static {
    /// Identifier of the protocol in the wire records.
    const ID: u16;
    /// Human-readable name, also used as the dictionary discriminator.
    const NAME: &'static str;
    /// Attributes, in rendering order.
    const FIELDS: &'static [FieldSpec<Self>];

    /// Return the descriptor of the attribute called `name`.
    fn field(name: &str) -> Option<FieldSpec<Self>> {
        Self::FIELDS.iter().find(|field| field.name == name).copied()
    }
}

/// The description of one attribute of protocol `P`.
pub struct FieldSpec<P> {
    name: &'static str,
    slot: &'static str,
    offset: u32,
    full_mask: u64,
    mask: u64,
    default: u64,
    override_slot: Option<&'static str>,
    kind: FieldKind,
    doc: &'static str,
    packet_full_mask: u64,
    packet_shift: u32,
    protocol: PhantomData<fn() -> P>,
}

impl<P> FieldSpec<P> {
    /// An integer attribute stored in the `mask` bits of the binary field `slot`.
    pub(crate) const fn integer(
        name: &'static str,
        slot: &'static str,
        offset: u32,
        full_mask: u64,
        mask: u64,
        default: u64,
        doc: &'static str,
    ) -> Self {
        FieldSpec {
            name,
            slot,
            offset,
            full_mask,
            mask,
            default,
            override_slot: None,
            kind: FieldKind::Integer,
            doc,
            packet_full_mask: full_mask,
            packet_shift: 0,
            protocol: PhantomData,
        }
    }

    /// A MAC address attribute occupying the whole 48-bit field `slot`.
    pub(crate) const fn mac(
        name: &'static str,
        slot: &'static str,
        offset: u32,
        default: u64,
        doc: &'static str,
    ) -> Self {
        FieldSpec {
            kind: FieldKind::Mac,
            ..Self::integer(name, slot, offset, 0xffff_ffff_ffff, 0xffff_ffff_ffff, default, doc)
        }
    }

    /// An IPv4 address attribute occupying the whole 32-bit field `slot`.
    pub(crate) const fn ipv4(
        name: &'static str,
        slot: &'static str,
        offset: u32,
        default: u64,
        doc: &'static str,
    ) -> Self {
        FieldSpec {
            kind: FieldKind::Ipv4,
            ..Self::integer(name, slot, offset, 0xffff_ffff, 0xffff_ffff, default, doc)
        }
    }

    /// Mark the attribute as computed by the traffic generator unless the
    /// override flag stored in `override_slot` is set.
    pub(crate) const fn computed(self, override_slot: &'static str) -> Self {
        FieldSpec {
            override_slot: Some(override_slot),
            ..self
        }
    }

    /// Declare that the binary field sits `shift` bits up in a `full_mask` wide
    /// word of the packet, while the wire record stores it right-aligned.
    ///
    /// Variable-field descriptors address packet bits, so they use the packed
    /// mask, value and step.
    pub(crate) const fn packed(self, full_mask: u64, shift: u32) -> Self {
        FieldSpec {
            packet_full_mask: full_mask,
            packet_shift: shift,
            ..self
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Name of the binary field holding this attribute in the wire record.
    pub const fn slot(&self) -> &'static str {
        self.slot
    }

    /// Byte offset of the binary field in the protocol header.
    pub const fn offset(&self) -> u32 {
        self.offset
    }

    /// Mask covering the whole binary field.
    pub const fn full_mask(&self) -> u64 {
        self.full_mask
    }

    /// Mask of the bits of the binary field used by this attribute.
    pub const fn mask(&self) -> u64 {
        self.mask
    }

    pub const fn shift(&self) -> u32 {
        shift_of(self.mask)
    }

    /// Largest value the attribute can hold.
    pub const fn max_value(&self) -> u64 {
        max_value(self.mask)
    }

    pub const fn default_value(&self) -> u64 {
        self.default
    }

    pub const fn override_slot(&self) -> Option<&'static str> {
        self.override_slot
    }

    /// Whether the traffic generator derives this attribute by default.
    pub const fn is_computed(&self) -> bool {
        self.override_slot.is_some()
    }

    pub const fn kind(&self) -> FieldKind {
        self.kind
    }

    pub const fn doc(&self) -> &'static str {
        self.doc
    }

    /// Counter width used by variable-field descriptors of this attribute.
    pub const fn counter(&self) -> CounterType {
        CounterType::for_mask(self.packet_full_mask)
    }

    /// Distance between the binary field bits in the wire record and in the packet.
    pub const fn packet_shift(&self) -> u32 {
        self.packet_shift
    }

    /// Mask of the attribute bits in the packet, used by variable-field descriptors.
    pub const fn packet_mask(&self) -> u64 {
        self.mask << self.packet_shift
    }

    /// Whether the attribute covers its whole binary field.
    pub const fn is_whole_field(&self) -> bool {
        self.mask == self.full_mask
    }
}

impl<P> Clone for FieldSpec<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P> Copy for FieldSpec<P> {}

impl<P> PartialEq for FieldSpec<P> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<P> Eq for FieldSpec<P> {}

impl<P> Debug for FieldSpec<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSpec")
            .field("name", &self.name)
            .field("slot", &self.slot)
            .field("offset", &self.offset)
            .field("full_mask", &format_args!("{:#x}", self.full_mask))
            .field("mask", &format_args!("{:#x}", self.mask))
            .field("default", &self.default)
            .field("override_slot", &self.override_slot)
            .field("kind", &self.kind)
            .field("packet_shift", &self.packet_shift)
            .finish()
    }
}

/// Check the invariants of an attribute table and return the defects found.
///
/// Attributes sharing a binary field must use disjoint masks within the full
/// mask, `(offset, mask)` pairs must be unique (variable fields are matched on
/// them), and an override flag belongs to a single attribute.
pub fn validate<P>(fields: &[FieldSpec<P>]) -> Vec<String> {
    let mut defects = Vec::new();
    let mut names = HashSet::new();
    let mut keys = HashSet::new();
    let mut overrides = HashSet::new();

    for (i, field) in fields.iter().enumerate() {
        if !names.insert(field.name) {
            defects.push(format!("{}: duplicate attribute name", field.name));
        }
        if field.mask == 0 {
            defects.push(format!("{}: empty mask", field.name));
        }
        if field.mask & !field.full_mask != 0 {
            defects.push(format!("{}: mask exceeds the binary field", field.name));
        } else if field.packet_mask() & !field.packet_full_mask != 0 {
            defects.push(format!("{}: packet mask exceeds the packet word", field.name));
        }
        let shifted = field.mask >> field.shift();
        if shifted & shifted.wrapping_add(1) != 0 {
            defects.push(format!("{}: mask is not contiguous", field.name));
        }
        if field.default > field.max_value() {
            defects.push(format!("{}: default does not fit", field.name));
        }
        if !keys.insert((field.offset, field.packet_mask())) {
            defects.push(format!(
                "{}: (offset, mask) pair ({}, {:#x}) already used",
                field.name,
                field.offset,
                field.packet_mask()
            ));
        }
        if let Some(slot) = field.override_slot {
            if !overrides.insert(slot) {
                defects.push(format!("{}: override flag {} already used", field.name, slot));
            }
        }
        for other in &fields[..i] {
            if other.slot != field.slot {
                if other.offset == field.offset {
                    if other.packet_full_mask != field.packet_full_mask {
                        defects.push(format!(
                            "{}: packet word at offset {} declared with another width by {}",
                            field.name, field.offset, other.name
                        ));
                    } else if other.packet_mask() & field.packet_mask() != 0 {
                        defects.push(format!(
                            "{}: packet bits overlap {}",
                            field.name, other.name
                        ));
                    }
                }
                continue;
            }
            if other.full_mask != field.full_mask || other.offset != field.offset {
                defects.push(format!(
                    "{}: binary field {} declared with another width or offset",
                    field.name, field.slot
                ));
            }
            if other.mask & field.mask != 0 {
                defects.push(format!("{}: mask overlaps {}", field.name, other.name));
            }
        }
    }

    defects
}

#[cfg(test)]
mod tests {
    use crate::record::CounterType;
    use crate::registry::{validate, FieldSpec};

    struct Fake;

    const HIGH: FieldSpec<Fake> = FieldSpec::integer("high", "byte", 0, 0xff, 0xf0, 4, "");
    const LOW: FieldSpec<Fake> = FieldSpec::integer("low", "byte", 0, 0xff, 0x0f, 5, "");

    #[test]
    fn test_descriptor() {
        assert_eq!(HIGH.shift(), 4);
        assert_eq!(HIGH.max_value(), 15);
        assert!(!HIGH.is_whole_field());
        assert!(!HIGH.is_computed());
        assert!(HIGH.computed("is_override_high").is_computed());
        assert_eq!(HIGH.counter(), CounterType::Counter8);
    }

    #[test]
    fn test_validate_valid() {
        assert!(validate(&[HIGH, LOW]).is_empty());
    }

    #[test]
    fn test_validate_overlap() {
        let middle = FieldSpec::<Fake>::integer("middle", "byte", 0, 0xff, 0x3c, 0, "");
        let defects = validate(&[HIGH, LOW, middle]);
        assert_eq!(defects.len(), 2);
        assert!(defects[0].contains("overlaps high"));
        assert!(defects[1].contains("overlaps low"));
    }

    #[test]
    fn test_validate_duplicate_key() {
        let other = FieldSpec::<Fake>::integer("other", "other", 0, 0xff, 0xf0, 0, "");
        let defects = validate(&[HIGH, other]);
        assert_eq!(defects.len(), 2);
        assert!(defects[0].contains("already used"));
        assert!(defects[1].contains("packet bits overlap high"));
    }

    #[test]
    fn test_validate_packed_fields() {
        let flags = FieldSpec::<Fake>::integer("flags", "flags", 6, 0xff, 0x07, 0, "");
        let offset = FieldSpec::<Fake>::integer("offset", "offset", 6, 0xffff, 0x1fff, 0, "");
        let defects = validate(&[flags, offset]);
        assert_eq!(defects.len(), 1);
        assert!(defects[0].contains("another width"));

        let flags = flags.packed(0xffff, 13);
        assert_eq!(flags.packet_mask(), 0xe000);
        assert_eq!(flags.counter(), CounterType::Counter16);
        assert!(validate(&[flags, offset]).is_empty());

        let defects = validate(&[flags.packed(0xffff, 12), offset]);
        assert_eq!(defects.len(), 1);
        assert!(defects[0].contains("packet bits overlap flags"));
    }

    #[test]
    fn test_validate_mask_outside_field() {
        let wide = FieldSpec::<Fake>::integer("wide", "wide", 1, 0xff, 0x1ff, 0, "");
        let sparse = FieldSpec::<Fake>::integer("sparse", "sparse", 2, 0xff, 0x81, 0, "");
        let big = FieldSpec::<Fake>::integer("big", "big", 3, 0xff, 0x0f, 16, "");
        let defects = validate(&[wide, sparse, big]);
        assert_eq!(defects.len(), 3);
    }

    #[test]
    fn test_validate_shared_override() {
        let a = HIGH.computed("is_override");
        let b = LOW.computed("is_override");
        assert_eq!(validate(&[a, b]).len(), 1);
    }
}
