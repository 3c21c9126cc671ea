//! Writing resolved clusters and install configs.
use std::io::Write;

use serde::ser;
use snafu::{ResultExt, Snafu};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize JSON"))]
    SerializeJson { source: serde_json::Error },

    #[snafu(display("failed to write YAML document separator"))]
    WriteDocumentSeparator { source: std::io::Error },

    #[snafu(display("failed to write trailing newline"))]
    WriteNewline { source: std::io::Error },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

impl OutputFormat {
    /// Writes `value` to `writer` in this format.
    pub fn write<T, W>(self, writer: W, value: &T) -> Result<()>
    where
        T: ser::Serialize,
        W: Write,
    {
        match self {
            Self::Yaml => serialize_to_explicit_document(writer, value),
            Self::Json => serialize_to_pretty_json(writer, value),
        }
    }
}

/// Serializes the given data structure as an explicit YAML document and writes it to a [`Write`].
///
/// # Example
///
/// ```
/// use rdr_config::output;
/// use serde_json::json;
///
/// let value = json!({"baseDomain": "example.com"});
///
/// let mut buf = Vec::new();
/// output::serialize_to_explicit_document(&mut buf, &value).unwrap();
/// let actual_yaml = std::str::from_utf8(&buf).unwrap();
///
/// assert_eq!(actual_yaml, "---\nbaseDomain: example.com\n");
/// ```
///
/// # Errors
///
/// Serialization can fail if `T`'s implementation of `Serialize` decides to return an error.
pub fn serialize_to_explicit_document<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: ser::Serialize,
    W: Write,
{
    writer
        .write_all(b"---\n")
        .context(WriteDocumentSeparatorSnafu)?;
    let mut serializer = serde_yaml::Serializer::new(writer);
    serde_yaml::with::singleton_map_recursive::serialize(value, &mut serializer)
        .context(SerializeYamlSnafu)?;
    Ok(())
}

/// Serializes `value` as pretty-printed JSON followed by a newline.
pub fn serialize_to_pretty_json<T, W>(mut writer: W, value: &T) -> Result<()>
where
    T: ser::Serialize,
    W: Write,
{
    serde_json::to_writer_pretty(&mut writer, value).context(SerializeJsonSnafu)?;
    writer.write_all(b"\n").context(WriteNewlineSnafu)?;
    Ok(())
}
