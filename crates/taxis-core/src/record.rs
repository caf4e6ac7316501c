//! Trip records and the selective line parser.
//!
//! A line of the yellow-taxi dataset has 17 comma-separated columns. Callers
//! pass a [`FieldSet`] naming the columns they need; every other column is
//! left at its zero value and never converted.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TripsError};
use crate::time_utils::parse_trip_time;

/// Number of columns in a trip line.
pub const FIELD_COUNT: usize = 17;

// ── Field ─────────────────────────────────────────────────────────────────────

/// One column of the trip schema, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    VendorId,
    PickupDatetime,
    DropoffDatetime,
    PassengerCount,
    TripDistance,
    RatecodeId,
    StoreAndFwdFlag,
    PuLocationId,
    DoLocationId,
    PaymentType,
    FareAmount,
    Extra,
    MtaTax,
    TipAmount,
    TollsAmount,
    ImprovementSurcharge,
    TotalAmount,
}

impl Field {
    /// All columns in file order.
    pub const ALL: [Field; FIELD_COUNT] = [
        Field::VendorId,
        Field::PickupDatetime,
        Field::DropoffDatetime,
        Field::PassengerCount,
        Field::TripDistance,
        Field::RatecodeId,
        Field::StoreAndFwdFlag,
        Field::PuLocationId,
        Field::DoLocationId,
        Field::PaymentType,
        Field::FareAmount,
        Field::Extra,
        Field::MtaTax,
        Field::TipAmount,
        Field::TollsAmount,
        Field::ImprovementSurcharge,
        Field::TotalAmount,
    ];

    /// Zero-based column position.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Column name as used in log output and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Field::VendorId => "vendor_id",
            Field::PickupDatetime => "tpep_pickup_datetime",
            Field::DropoffDatetime => "tpep_dropoff_datetime",
            Field::PassengerCount => "passenger_count",
            Field::TripDistance => "trip_distance",
            Field::RatecodeId => "ratecode_id",
            Field::StoreAndFwdFlag => "store_and_fwd_flag",
            Field::PuLocationId => "pu_location_id",
            Field::DoLocationId => "do_location_id",
            Field::PaymentType => "payment_type",
            Field::FareAmount => "fare_amount",
            Field::Extra => "extra",
            Field::MtaTax => "mta_tax",
            Field::TipAmount => "tip_amount",
            Field::TollsAmount => "tolls_amount",
            Field::ImprovementSurcharge => "improvement_surcharge",
            Field::TotalAmount => "total_amount",
        }
    }

    /// `true` for columns that [`Trip::numeric`] can expose as `f64`.
    pub fn is_numeric(self) -> bool {
        !matches!(self, Field::StoreAndFwdFlag)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── FieldSet ──────────────────────────────────────────────────────────────────

/// Bitmask of the columns a parse should convert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldSet(u32);

impl FieldSet {
    /// No columns.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every column.
    pub const fn all() -> Self {
        Self((1 << FIELD_COUNT) - 1)
    }

    /// Build a set from a list of columns.
    pub fn of(fields: &[Field]) -> Self {
        fields.iter().fold(Self::empty(), |set, f| set.with(*f))
    }

    /// Return a copy of the set including `field`.
    pub const fn with(self, field: Field) -> Self {
        Self(self.0 | (1 << field as u32))
    }

    pub const fn contains(self, field: Field) -> bool {
        self.0 & (1 << field as u32) != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the members in column order.
    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

// ── Trip ──────────────────────────────────────────────────────────────────────

/// One taxi trip. Only the fields requested at parse time are populated.
///
/// Times are epoch seconds (UTC).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trip {
    pub vendor_id: i32,
    pub pickup_datetime: i64,
    pub dropoff_datetime: i64,
    pub passenger_count: i32,
    pub trip_distance: f64,
    pub ratecode_id: i32,
    pub store_and_fwd_flag: String,
    pub pu_location_id: i32,
    pub do_location_id: i32,
    pub payment_type: i32,
    pub fare_amount: f64,
    pub extra: f64,
    pub mta_tax: f64,
    pub tip_amount: f64,
    pub tolls_amount: f64,
    pub improvement_surcharge: f64,
    pub total_amount: f64,
}

impl Trip {
    /// Parse one CSV line, converting only the columns in `wanted`.
    ///
    /// Fails with [`TripsError::MalformedRecord`] when the line does not have
    /// exactly [`FIELD_COUNT`] columns and [`TripsError::FieldParse`] when a
    /// wanted column can not be converted.
    pub fn parse(line: &str, wanted: FieldSet) -> Result<Trip> {
        let mut cols = [""; FIELD_COUNT];
        let mut count = 0usize;
        for part in line.split(',') {
            if count < FIELD_COUNT {
                cols[count] = part;
            }
            count += 1;
        }
        if count != FIELD_COUNT {
            return Err(TripsError::MalformedRecord {
                expected: FIELD_COUNT,
                actual: count,
            });
        }

        let mut trip = Trip::default();
        for field in wanted.iter() {
            trip.set(field, cols[field.index()])?;
        }
        Ok(trip)
    }

    /// Value of a numeric column as `f64`; `None` for the flag column.
    pub fn numeric(&self, field: Field) -> Option<f64> {
        let v = match field {
            Field::VendorId => f64::from(self.vendor_id),
            Field::PickupDatetime => self.pickup_datetime as f64,
            Field::DropoffDatetime => self.dropoff_datetime as f64,
            Field::PassengerCount => f64::from(self.passenger_count),
            Field::TripDistance => self.trip_distance,
            Field::RatecodeId => f64::from(self.ratecode_id),
            Field::StoreAndFwdFlag => return None,
            Field::PuLocationId => f64::from(self.pu_location_id),
            Field::DoLocationId => f64::from(self.do_location_id),
            Field::PaymentType => f64::from(self.payment_type),
            Field::FareAmount => self.fare_amount,
            Field::Extra => self.extra,
            Field::MtaTax => self.mta_tax,
            Field::TipAmount => self.tip_amount,
            Field::TollsAmount => self.tolls_amount,
            Field::ImprovementSurcharge => self.improvement_surcharge,
            Field::TotalAmount => self.total_amount,
        };
        Some(v)
    }

    fn set(&mut self, field: Field, raw: &str) -> Result<()> {
        match field {
            Field::VendorId => self.vendor_id = parse_num(field, raw)?,
            Field::PickupDatetime => self.pickup_datetime = parse_time(field, raw)?,
            Field::DropoffDatetime => self.dropoff_datetime = parse_time(field, raw)?,
            Field::PassengerCount => self.passenger_count = parse_num(field, raw)?,
            Field::TripDistance => self.trip_distance = parse_num(field, raw)?,
            Field::RatecodeId => self.ratecode_id = parse_num(field, raw)?,
            Field::StoreAndFwdFlag => self.store_and_fwd_flag = raw.to_string(),
            Field::PuLocationId => self.pu_location_id = parse_num(field, raw)?,
            Field::DoLocationId => self.do_location_id = parse_num(field, raw)?,
            Field::PaymentType => self.payment_type = parse_num(field, raw)?,
            Field::FareAmount => self.fare_amount = parse_num(field, raw)?,
            Field::Extra => self.extra = parse_num(field, raw)?,
            Field::MtaTax => self.mta_tax = parse_num(field, raw)?,
            Field::TipAmount => self.tip_amount = parse_num(field, raw)?,
            Field::TollsAmount => self.tolls_amount = parse_num(field, raw)?,
            Field::ImprovementSurcharge => self.improvement_surcharge = parse_num(field, raw)?,
            Field::TotalAmount => self.total_amount = parse_num(field, raw)?,
        }
        Ok(())
    }
}

fn parse_num<T: FromStr>(field: Field, raw: &str) -> Result<T> {
    raw.parse().map_err(|_| field_error(field, raw))
}

fn parse_time(field: Field, raw: &str) -> Result<i64> {
    parse_trip_time(raw).ok_or_else(|| field_error(field, raw))
}

fn field_error(field: Field, raw: &str) -> TripsError {
    TripsError::FieldParse {
        field,
        value: raw.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
