/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 27/1/26
******************************************************************************/

//! Dictionary-driven message packager.
//!
//! A [`Packager`] compiles a [`FieldDictionary`] into a table of field
//! codecs once, then packs and unpacks any number of messages against it.
//! Composite fields compile to nested sub-packagers and are handled by
//! recursion; the message itself never knows how its fields are laid out.

use crate::bitmap::BitmapChain;
use crate::config::{MtiEncoding, PackagerConfig};
use crate::field::{FieldCodec, LengthPrefix};
use crate::reader::ByteReader;
use bytes::{BufMut, Bytes, BytesMut};
use ironiso_core::{DecodeError, EncodeError, FieldPath, FieldValue, IsoMessage, Mti};
use ironiso_dictionary::{FieldDictionary, FieldSpec};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Conventional field number of the MTI, used in error paths.
const MTI_FIELD: u16 = 0;

/// Conventional field number of the primary bitmap, used in error paths.
const BITMAP_FIELD: u16 = 1;

/// Compiled layout of one field.
#[derive(Debug, Clone)]
enum FieldPackager {
    Leaf(FieldCodec),
    Composite(SubPackager),
}

/// Compiled layout of a composite field.
#[derive(Debug, Clone)]
struct SubPackager {
    /// Body length when the composite has no length prefix.
    length: usize,
    prefix: Option<LengthPrefix>,
    /// Single-level chain when subfields are announced by a bitmap,
    /// otherwise every subfield is positional and mandatory.
    bitmap: Option<BitmapChain>,
    fields: BTreeMap<u16, FieldPackager>,
}

impl FieldPackager {
    fn build(spec: &FieldSpec, config: &PackagerConfig) -> Self {
        if !spec.is_composite() {
            return Self::Leaf(FieldCodec::new(spec));
        }
        Self::Composite(SubPackager {
            length: spec.length.max_length(),
            prefix: LengthPrefix::for_class(spec.length, spec.prefix),
            bitmap: spec
                .subfield_bitmap
                .then(|| BitmapChain::new(config.bitmap_encoding, 1, 1)),
            fields: spec
                .subfields
                .iter()
                .map(|sub| (sub.number, Self::build(sub, config)))
                .collect(),
        })
    }

    fn encode(
        &self,
        path: &FieldPath,
        value: &FieldValue,
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        match (self, value) {
            (Self::Leaf(codec), FieldValue::Terminal(bytes)) => codec.encode(path, bytes, out),
            (Self::Composite(sub), FieldValue::Composite(map)) => sub.encode(path, map, out),
            (Self::Leaf(_), FieldValue::Composite(_)) => Err(EncodeError::InvalidValue {
                field: path.clone(),
                reason: "composite value for a leaf field".into(),
            }),
            (Self::Composite(_), FieldValue::Terminal(_)) => Err(EncodeError::InvalidValue {
                field: path.clone(),
                reason: "terminal value for a composite field".into(),
            }),
        }
    }

    fn decode(
        &self,
        path: &FieldPath,
        reader: &mut ByteReader<'_>,
    ) -> Result<FieldValue, DecodeError> {
        match self {
            Self::Leaf(codec) => codec.decode(path, reader).map(FieldValue::Terminal),
            Self::Composite(sub) => sub.decode(path, reader),
        }
    }
}

impl SubPackager {
    fn encode(
        &self,
        path: &FieldPath,
        values: &BTreeMap<u16, FieldValue>,
        out: &mut BytesMut,
    ) -> Result<(), EncodeError> {
        let mut body = BytesMut::new();

        match &self.bitmap {
            Some(chain) => {
                chain.write(values.keys().copied(), &mut body)?;
                for (number, value) in values {
                    let sub_path = path.child(*number);
                    let packager = self
                        .fields
                        .get(number)
                        .ok_or_else(|| EncodeError::UnknownField {
                            field: sub_path.clone(),
                        })?;
                    packager.encode(&sub_path, value, &mut body)?;
                }
            }
            None => {
                if let Some(number) = values.keys().find(|n| !self.fields.contains_key(n)) {
                    return Err(EncodeError::UnknownField {
                        field: path.child(*number),
                    });
                }
                for (number, packager) in &self.fields {
                    let value = values.get(number).ok_or_else(|| EncodeError::MissingSubfield {
                        field: path.clone(),
                        subfield: *number,
                    })?;
                    packager.encode(&path.child(*number), value, &mut body)?;
                }
            }
        }

        match &self.prefix {
            Some(prefix) => prefix.encode(path, body.len(), out)?,
            None if body.len() > self.length => {
                return Err(EncodeError::ValueTooLong {
                    field: path.clone(),
                    length: body.len(),
                    max_length: self.length,
                });
            }
            None if body.len() < self.length => {
                return Err(EncodeError::InvalidValue {
                    field: path.clone(),
                    reason: format!(
                        "composite packs to {} bytes, expected {}",
                        body.len(),
                        self.length
                    ),
                });
            }
            None => {}
        }
        out.put_slice(&body);
        Ok(())
    }

    fn decode(
        &self,
        path: &FieldPath,
        reader: &mut ByteReader<'_>,
    ) -> Result<FieldValue, DecodeError> {
        let len = match &self.prefix {
            Some(prefix) => prefix.decode(path, reader)?,
            None => self.length,
        };
        let mut inner = reader.sub(len, path)?;
        let mut values = BTreeMap::new();

        match &self.bitmap {
            Some(chain) => {
                let present = chain.read(&mut inner, &path.child(BITMAP_FIELD))?;
                for number in present {
                    let sub_path = path.child(number);
                    let packager = self.fields.get(&number).ok_or_else(|| {
                        DecodeError::UnknownField {
                            field: sub_path.clone(),
                            offset: inner.offset(),
                        }
                    })?;
                    values.insert(number, packager.decode(&sub_path, &mut inner)?);
                }
            }
            None => {
                for (number, packager) in &self.fields {
                    values.insert(*number, packager.decode(&path.child(*number), &mut inner)?);
                }
            }
        }

        if !inner.is_empty() {
            return Err(DecodeError::MalformedField {
                field: path.clone(),
                offset: inner.offset(),
                reason: format!("{} unused bytes in composite", inner.remaining()),
            });
        }
        Ok(FieldValue::Composite(values))
    }
}

/// Packs and unpacks ISO 8583 messages for one dictionary.
///
/// Built once and shared (typically behind an `Arc`); packing and
/// unpacking take `&self` and never block.
#[derive(Debug, Clone)]
pub struct Packager {
    dictionary: Arc<FieldDictionary>,
    config: PackagerConfig,
    chain: BitmapChain,
    fields: BTreeMap<u16, FieldPackager>,
}

impl Packager {
    /// Compiles a packager.
    ///
    /// # Arguments
    /// * `dictionary` - The field dictionary
    /// * `config` - Message-level layout choices
    #[must_use]
    pub fn new(dictionary: Arc<FieldDictionary>, config: PackagerConfig) -> Self {
        let fields: BTreeMap<u16, FieldPackager> = dictionary
            .fields()
            .map(|spec| (spec.number, FieldPackager::build(spec, &config)))
            .collect();
        debug!(
            dictionary = dictionary.name(),
            fields = fields.len(),
            ?config,
            "packager built"
        );
        Self {
            chain: BitmapChain::new(config.bitmap_encoding, config.min_bitmaps, config.max_bitmaps),
            dictionary,
            config,
            fields,
        }
    }

    /// Compiles a packager over the process-wide dictionary.
    ///
    /// Returns `None` until [`ironiso_dictionary::global::init`] has run.
    #[must_use]
    pub fn from_global(config: PackagerConfig) -> Option<Self> {
        ironiso_dictionary::global::get().map(|dictionary| Self::new(dictionary, config))
    }

    /// Returns the dictionary.
    #[must_use]
    pub fn dictionary(&self) -> &FieldDictionary {
        &self.dictionary
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &PackagerConfig {
        &self.config
    }

    /// Packs a message.
    ///
    /// # Errors
    /// Returns `EncodeError::InvalidFieldNumber` for a field the bitmap chain
    /// cannot address, `EncodeError::UnknownField` for a field missing from
    /// the dictionary and the field codec errors unchanged.
    pub fn pack(&self, msg: &IsoMessage) -> Result<Bytes, EncodeError> {
        let mut out = BytesMut::with_capacity(256);
        self.pack_into(msg, &mut out)?;
        Ok(out.freeze())
    }

    /// Packs a message, appending to `out`.
    ///
    /// On error `out` may hold a partial message.
    ///
    /// # Errors
    /// Same as [`Packager::pack`].
    pub fn pack_into(&self, msg: &IsoMessage, out: &mut BytesMut) -> Result<(), EncodeError> {
        let start = out.len();
        match self.config.mti_encoding {
            MtiEncoding::Ascii => out.put_slice(msg.mti().as_bytes()),
            MtiEncoding::Bcd => out.put_slice(&msg.mti().to_bcd()),
        }

        self.chain.write(msg.field_numbers(), out)?;

        for (number, value) in msg.fields() {
            let path = FieldPath::new(number);
            let packager = self
                .fields
                .get(&number)
                .ok_or_else(|| EncodeError::UnknownField {
                    field: path.clone(),
                })?;
            packager.encode(&path, value, out)?;
        }

        trace!(
            mti = %msg.mti(),
            fields = msg.len(),
            bytes = out.len() - start,
            "packed message"
        );
        Ok(())
    }

    /// Unpacks a message.
    ///
    /// # Errors
    /// Returns `DecodeError::TruncatedMessage` when the buffer ends inside a
    /// field, `DecodeError::UnknownField` for a bit announcing an undefined
    /// field, `DecodeError::TrailingBytes` for unconsumed input (unless
    /// allowed), `DecodeError::InvalidMti` and the field codec errors.
    pub fn unpack(&self, data: &[u8]) -> Result<IsoMessage, DecodeError> {
        let mut reader = ByteReader::new(data);

        let mti_path = FieldPath::new(MTI_FIELD);
        let mti = match self.config.mti_encoding {
            MtiEncoding::Ascii => Mti::from_ascii(reader.take(4, &mti_path)?)?,
            MtiEncoding::Bcd => {
                let raw = reader.take(2, &mti_path)?;
                Mti::from_bcd([raw[0], raw[1]])?
            }
        };
        let mut msg = IsoMessage::new(mti);

        let present = self.chain.read(&mut reader, &FieldPath::new(BITMAP_FIELD))?;
        for number in present {
            let path = FieldPath::new(number);
            let packager = self
                .fields
                .get(&number)
                .ok_or_else(|| DecodeError::UnknownField {
                    field: path.clone(),
                    offset: reader.offset(),
                })?;
            let value = packager.decode(&path, &mut reader)?;
            msg.set(number, value);
        }

        if !reader.is_empty() {
            if !self.config.allow_trailing_bytes {
                return Err(DecodeError::TrailingBytes {
                    offset: reader.offset(),
                    remaining: reader.remaining(),
                });
            }
            trace!(remaining = reader.remaining(), "ignoring trailing bytes");
        }

        trace!(mti = %mti, fields = msg.len(), bytes = data.len(), "unpacked message");
        Ok(msg)
    }
}
