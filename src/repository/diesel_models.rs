//! Diesel ORM models for database tables.
//!
//! These stay inside the repository layer; callers only see the
//! domain types from [`crate::models`].

use diesel::prelude::*;

use crate::models::{Call, CharFrequency, LongestLine, NewCall, NewCharFrequency};
use crate::schema;

/// Call record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::calls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CallRecord {
    pub id: i64,
    pub salvo_no: i64,
    pub req_no: i64,
    pub status: i32,
    pub req_start: i64,
    pub res_finish: i64,
    pub attempt_no: i32,
    pub char_count: i64,
}

/// New call for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::calls)]
pub struct NewCallRecord {
    pub salvo_no: i64,
    pub req_no: i64,
    pub status: i32,
    pub req_start: i64,
    pub res_finish: i64,
    pub attempt_no: i32,
    pub char_count: i64,
}

impl From<&NewCall> for NewCallRecord {
    fn from(call: &NewCall) -> Self {
        Self {
            salvo_no: call.salvo_no,
            req_no: call.req_no,
            status: i32::from(call.status),
            req_start: call.req_start,
            res_finish: call.res_finish,
            attempt_no: call.attempt_no as i32,
            char_count: call.char_count as i64,
        }
    }
}

impl From<CallRecord> for Call {
    fn from(record: CallRecord) -> Self {
        Call {
            id: record.id,
            salvo_no: record.salvo_no,
            req_no: record.req_no,
            status: u16::try_from(record.status).unwrap_or(0),
            req_start: record.req_start,
            res_finish: record.res_finish,
            attempt_no: record.attempt_no.max(0) as u32,
            char_count: record.char_count.max(0) as u64,
        }
    }
}

/// Character frequency record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::characters)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct CharacterRecord {
    pub id: i64,
    pub call_id: i64,
    pub ch: String,
    pub freq: i64,
}

/// New character frequency for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::characters)]
pub struct NewCharacterRecord {
    pub call_id: i64,
    pub ch: String,
    pub freq: i64,
}

impl From<&NewCharFrequency> for NewCharacterRecord {
    fn from(record: &NewCharFrequency) -> Self {
        Self {
            call_id: record.call_id,
            ch: record.ch.to_string(),
            freq: record.freq as i64,
        }
    }
}

impl From<CharacterRecord> for CharFrequency {
    fn from(record: CharacterRecord) -> Self {
        CharFrequency {
            id: record.id,
            call_id: record.call_id,
            ch: record.ch.chars().next().unwrap_or(char::REPLACEMENT_CHARACTER),
            freq: record.freq.max(0) as u64,
        }
    }
}

/// Longest-line record from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::lines)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LineRecord {
    pub id: i64,
    pub url: String,
    pub longest_length: i64,
}

/// New longest-line record for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::lines)]
pub struct NewLineRecord<'a> {
    pub url: &'a str,
    pub longest_length: i64,
}

impl From<LineRecord> for LongestLine {
    fn from(record: LineRecord) -> Self {
        LongestLine {
            id: record.id,
            url: record.url,
            longest_length: record.longest_length.max(0) as u64,
        }
    }
}
