//! Identifiers, party references and timestamps shared by every document
use crate::error::ContractError;
use crate::utils;
use chrono::{DateTime, TimeZone, Utc};
use std::fmt;

/// Collection prefix carried as the bech32 human readable part of a [`RecordId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    Agency,
    Business,
    Worker,
    BusinessContract,
    WorkContract,
    SubContract,
}

impl Prefix {
    pub const ALL: [Prefix; 6] = [
        Prefix::Agency,
        Prefix::Business,
        Prefix::Worker,
        Prefix::BusinessContract,
        Prefix::WorkContract,
        Prefix::SubContract,
    ];

    pub fn hrp(&self) -> &'static str {
        match self {
            Prefix::Agency => "agency_",
            Prefix::Business => "business_",
            Prefix::Worker => "worker_",
            Prefix::BusinessContract => "bcontract_",
            Prefix::WorkContract => "wcontract_",
            Prefix::SubContract => "sub_",
        }
    }

    fn from_hrp(hrp: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.hrp() == hrp)
    }
}

/// Document identifier: a uuid7 encoded as bech32m under a collection prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate(prefix: Prefix) -> Self {
        let encoded = utils::new_uuid_to_bech32(prefix.hrp())
            .expect("failed to encode a uuid7 under a static prefix");
        Self(encoded)
    }

    /// Parses an identifier received from a caller.
    pub fn parse(raw: &str) -> Result<Self, ContractError> {
        let (hrp, data) = bech32::decode(raw)
            .map_err(|e| ContractError::MalformedInput(format!("invalid id {raw}: {e}")))?;

        if Prefix::from_hrp(hrp.as_str()).is_none() {
            return Err(ContractError::MalformedInput(format!(
                "unknown id prefix {}",
                hrp.as_str()
            )));
        }
        if data.len() != 16 {
            return Err(ContractError::MalformedInput(format!(
                "id {raw} does not carry a uuid"
            )));
        }

        Ok(Self(raw.to_owned()))
    }

    /// Parses an identifier that must belong to one collection.
    pub fn parse_as(raw: &str, prefix: Prefix) -> Result<Self, ContractError> {
        let id = Self::parse(raw)?;
        if id.prefix() != Some(prefix) {
            return Err(ContractError::MalformedInput(format!(
                "expected a {} id, got {raw}",
                prefix.hrp()
            )));
        }
        Ok(id)
    }

    pub fn prefix(&self) -> Option<Prefix> {
        let (hrp, _) = self.0.rsplit_once('1')?;
        Prefix::from_hrp(hrp)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<C> minicbor::Encode<C> for RecordId {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        e.str(&self.0)?.ok()
    }
}

impl<'b, C> minicbor::Decode<'b, C> for RecordId {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        Ok(RecordId(d.str()?.to_owned()))
    }
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartyKind {
    #[n(0)]
    Agency,
    #[n(1)]
    Business,
    #[n(2)]
    Worker,
}

impl PartyKind {
    pub fn prefix(&self) -> Prefix {
        match self {
            PartyKind::Agency => Prefix::Agency,
            PartyKind::Business => Prefix::Business,
            PartyKind::Worker => Prefix::Worker,
        }
    }
}

impl fmt::Display for PartyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartyKind::Agency => f.write_str("agency"),
            PartyKind::Business => f.write_str("business"),
            PartyKind::Worker => f.write_str("worker"),
        }
    }
}

/// The two kinds of party that affiliate with an agency.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    #[n(0)]
    Business,
    #[n(1)]
    Worker,
}

/// A party resolved to its kind. Actors handed over by authentication use the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PartyRef {
    Agency(RecordId),
    Business(RecordId),
    Worker(RecordId),
}

impl PartyRef {
    pub fn new(kind: PartyKind, id: RecordId) -> Self {
        match kind {
            PartyKind::Agency => PartyRef::Agency(id),
            PartyKind::Business => PartyRef::Business(id),
            PartyKind::Worker => PartyRef::Worker(id),
        }
    }

    pub fn id(&self) -> &RecordId {
        match self {
            PartyRef::Agency(id) | PartyRef::Business(id) | PartyRef::Worker(id) => id,
        }
    }

    pub fn kind(&self) -> PartyKind {
        match self {
            PartyRef::Agency(_) => PartyKind::Agency,
            PartyRef::Business(_) => PartyKind::Business,
            PartyRef::Worker(_) => PartyKind::Worker,
        }
    }

    pub fn member_kind(&self) -> Option<MemberKind> {
        match self {
            PartyRef::Agency(_) => None,
            PartyRef::Business(_) => Some(MemberKind::Business),
            PartyRef::Worker(_) => Some(MemberKind::Worker),
        }
    }

    pub fn is_agency(&self, id: &RecordId) -> bool {
        matches!(self, PartyRef::Agency(own) if own == id)
    }

    pub fn is_business(&self, id: &RecordId) -> bool {
        matches!(self, PartyRef::Business(own) if own == id)
    }
}

impl fmt::Display for PartyRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub struct TimeStamp<T: TimeZone>(DateTime<T>);

impl TimeStamp<Utc> {
    pub fn new() -> Self {
        Self(Utc::now())
    }
    pub fn new_with(year: i32, month: u32, day: u32, hour: u32, min: u32, sec: u32) -> Self {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .unwrap()
            .into()
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp<Utc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: TimeZone> From<DateTime<T>> for TimeStamp<T> {
    fn from(value: DateTime<T>) -> Self {
        TimeStamp(value)
    }
}

impl<C> minicbor::Encode<C> for TimeStamp<Utc> {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        _: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        if let Some(nsec) = self.0.timestamp_nanos_opt() {
            return e.i64(nsec)?.ok();
        }

        Err(minicbor::encode::Error::message(
            "failed to encode timestamp. timestamp_nanos_opt returned None",
        ))
    }
}

impl<'b, C> minicbor::Decode<'b, C> for TimeStamp<Utc> {
    fn decode(d: &mut minicbor::Decoder<'b>, _: &mut C) -> Result<Self, minicbor::decode::Error> {
        let nsecs = d.i64()?;

        Ok(TimeStamp(DateTime::from_timestamp_nanos(nsecs)))
    }
}

/// Start and end of a sub-contract engagement.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, PartialEq, Eq)]
pub struct ValidityPeriod {
    #[n(0)]
    pub start_date: TimeStamp<Utc>,
    #[n(1)]
    pub end_date: TimeStamp<Utc>,
}

impl ValidityPeriod {
    pub fn new(start_date: TimeStamp<Utc>, end_date: TimeStamp<Utc>) -> Result<Self, ContractError> {
        if start_date.to_datetime_utc() > end_date.to_datetime_utc() {
            return Err(ContractError::MalformedInput(
                "validity period ends before it starts".into(),
            ));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }
}
