//! Positional decoding of a row into caller-typed slots.
//!
//! Destinations are passed as `&mut [&mut dyn ScanSlot]`, so any variable can
//! be offered; the scanner fills `String`, `i16`, `i32`, `i64`, `isize` and
//! `f64` and rejects every other type at runtime.

use crate::connection::params::ScanMode;
use crate::error::{ConversionError, DriverError, ScanError};
use std::any::{type_name, Any};

/// A destination for [`scan_row`].
///
/// Implemented for every `'static` type; unsupported ones fail the scan
/// with their type name.
pub trait ScanSlot {
    /// Rust type name of the slot.
    fn slot_type(&self) -> &'static str;

    /// Shared view for type checks.
    fn as_any(&self) -> &dyn Any;

    /// Mutable view for writing.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> ScanSlot for T {
    fn slot_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum SlotKind {
    Text,
    I16,
    I32,
    I64,
    Isize,
    F64,
}

impl SlotKind {
    fn of(slot: &dyn Any) -> Option<Self> {
        if slot.is::<String>() {
            Some(SlotKind::Text)
        } else if slot.is::<i16>() {
            Some(SlotKind::I16)
        } else if slot.is::<i32>() {
            Some(SlotKind::I32)
        } else if slot.is::<i64>() {
            Some(SlotKind::I64)
        } else if slot.is::<isize>() {
            Some(SlotKind::Isize)
        } else if slot.is::<f64>() {
            Some(SlotKind::F64)
        } else {
            None
        }
    }

    fn name(&self) -> &'static str {
        match self {
            SlotKind::Text => "String",
            SlotKind::I16 => "i16",
            SlotKind::I32 => "i32",
            SlotKind::I64 => "i64",
            SlotKind::Isize => "isize",
            SlotKind::F64 => "f64",
        }
    }
}

enum Parsed {
    Text(String),
    I16(i16),
    I32(i32),
    I64(i64),
    Isize(isize),
    F64(f64),
}

/// Decode `fields` positionally into `dest`.
///
/// Arity and slot types are checked before anything is written, and under
/// [`ScanMode::Strict`] every field is parsed before the first write, so a
/// failed scan leaves all destinations untouched. Under
/// [`ScanMode::Lenient`] a field that does not parse becomes zero; integer
/// fields are read as 64-bit and narrowed to the slot width.
///
/// # Errors
/// - `ScanError::ArityMismatch` if `dest.len() != fields.len()`
/// - `ScanError::UnsupportedType` for the first slot of an unsupported type
/// - `ConversionError::ValueConversionFailed` in strict mode
pub fn scan_row(
    fields: &[String],
    dest: &mut [&mut dyn ScanSlot],
    mode: ScanMode,
) -> Result<(), DriverError> {
    if dest.len() != fields.len() {
        return Err(ScanError::ArityMismatch {
            expected: dest.len(),
            actual: fields.len(),
        }
        .into());
    }

    let kinds = dest
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            // deref to the trait object so the blanket impl is not picked for the reference
            let slot: &dyn ScanSlot = &**slot;
            SlotKind::of(slot.as_any()).ok_or(ScanError::UnsupportedType {
                index,
                type_name: slot.slot_type(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let parsed = fields
        .iter()
        .zip(&kinds)
        .map(|(raw, kind)| parse_field(raw, *kind, mode))
        .collect::<Result<Vec<_>, _>>()?;

    for (slot, value) in dest.iter_mut().zip(parsed) {
        let slot = (**slot).as_any_mut();
        match value {
            Parsed::Text(v) => write_slot(slot, v),
            Parsed::I16(v) => write_slot(slot, v),
            Parsed::I32(v) => write_slot(slot, v),
            Parsed::I64(v) => write_slot(slot, v),
            Parsed::Isize(v) => write_slot(slot, v),
            Parsed::F64(v) => write_slot(slot, v),
        }
    }

    Ok(())
}

fn write_slot<T: Any>(slot: &mut dyn Any, value: T) {
    if let Some(target) = slot.downcast_mut::<T>() {
        *target = value;
    }
}

fn parse_field(raw: &str, kind: SlotKind, mode: ScanMode) -> Result<Parsed, ConversionError> {
    if let SlotKind::Text = kind {
        return Ok(Parsed::Text(raw.to_string()));
    }

    match mode {
        ScanMode::Lenient => {
            let parsed = match kind {
                SlotKind::F64 => Parsed::F64(raw.parse().unwrap_or(0.0)),
                _ => {
                    let wide: i64 = raw.parse().unwrap_or(0);
                    match kind {
                        SlotKind::I16 => Parsed::I16(wide as i16),
                        SlotKind::I32 => Parsed::I32(wide as i32),
                        SlotKind::Isize => Parsed::Isize(wide as isize),
                        _ => Parsed::I64(wide),
                    }
                }
            };
            Ok(parsed)
        }
        ScanMode::Strict => {
            let fail = |message: String| ConversionError::ValueConversionFailed {
                value: raw.to_string(),
                target: kind.name().to_string(),
                message,
            };
            match kind {
                SlotKind::I16 => raw.parse().map(Parsed::I16).map_err(|e| fail(e.to_string())),
                SlotKind::I32 => raw.parse().map(Parsed::I32).map_err(|e| fail(e.to_string())),
                SlotKind::I64 => raw.parse().map(Parsed::I64).map_err(|e| fail(e.to_string())),
                SlotKind::Isize => raw
                    .parse()
                    .map(Parsed::Isize)
                    .map_err(|e| fail(e.to_string())),
                SlotKind::F64 => raw.parse().map(Parsed::F64).map_err(|e| fail(e.to_string())),
                SlotKind::Text => Ok(Parsed::Text(raw.to_string())),
            }
        }
    }
}
