//! Operation replies
//!
//! Every API operation answers with a `Status` and, on success, an optional
//! payload. On the wire a reply is a JSON array: `[status]` or
//! `[status, payload]`.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::status::Status;

/// Key of the generic failure message
pub const MESSAGE_KEY: &str = "message";

#[derive(Debug, Clone, PartialEq)]
pub struct Reply<T> {
    pub status: Status,
    pub payload: Option<T>,
}

impl<T> Reply<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            status: Status::new(),
            payload: Some(payload),
        }
    }

    pub fn failed(status: Status) -> Self {
        Self {
            status,
            payload: None,
        }
    }

    /// Failure carrying only a generic `"message"` entry
    pub fn message(message: &str) -> Self {
        Self::failed(Status::with_error(MESSAGE_KEY, message))
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Payload on success, status otherwise
    pub fn into_result(self) -> Result<Option<T>, Status> {
        if self.status.is_success() {
            Ok(self.payload)
        } else {
            Err(self.status)
        }
    }
}

impl<T: Serialize> Serialize for Reply<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let len = if self.payload.is_some() { 2 } else { 1 };
        let mut seq = serializer.serialize_seq(Some(len))?;
        seq.serialize_element(&self.status)?;
        if let Some(payload) = &self.payload {
            seq.serialize_element(payload)?;
        }
        seq.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Reply<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ReplyVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for ReplyVisitor<T> {
            type Value = Reply<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an array of a status and an optional payload")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let status: Status = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let payload = seq.next_element()?;
                if seq.next_element::<de::IgnoredAny>()?.is_some() {
                    return Err(de::Error::invalid_length(3, &self));
                }
                Ok(Reply { status, payload })
            }
        }

        deserializer.deserialize_seq(ReplyVisitor(PhantomData))
    }
}
