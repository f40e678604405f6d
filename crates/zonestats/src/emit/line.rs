//! InfluxDB line protocol.

use zonestats_core::SourceKind;

/// Builder for one line protocol line.
///
/// ```
/// use zonestats::emit::LineBuilder;
/// use zonestats_core::SourceKind;
///
/// let line = LineBuilder::zone("CountDom", "se", SourceKind::File)
///     .int("value", 42)
///     .build();
/// assert_eq!(line, "CountDom,tld=se,source=file value=42i\n");
/// ```
#[derive(Debug, Clone)]
pub struct LineBuilder {
    head: String,
    fields: Vec<String>,
}

impl LineBuilder {
    /// Start a line for `measurement`
    #[must_use]
    pub fn new(measurement: &str) -> Self {
        Self {
            head: escape(measurement, &[',', ' ']),
            fields: Vec::new(),
        }
    }

    /// Start a line tagged with the zone and source kind
    #[must_use]
    pub fn zone(measurement: &str, zone: &str, source: SourceKind) -> Self {
        Self::new(measurement)
            .tag("tld", zone)
            .tag("source", source.as_str())
    }

    /// Append a tag
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.head.push(',');
        self.head.push_str(&escape_key(key));
        self.head.push('=');
        self.head.push_str(&escape_key(value));
        self
    }

    /// Append an integer field
    #[must_use]
    pub fn int(mut self, key: &str, value: u64) -> Self {
        self.fields.push(format!("{}={value}i", escape_key(key)));
        self
    }

    /// Append a boolean as a 0/1 integer field
    #[must_use]
    pub fn flag(self, key: &str, value: bool) -> Self {
        self.int(key, u64::from(value))
    }

    /// Append a string field
    #[must_use]
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.fields.push(format!(
            "{}=\"{}\"",
            escape_key(key),
            escape(value, &['"', '\\'])
        ));
        self
    }

    /// Whether any field was added
    #[must_use]
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }

    /// Finish the line, newline included
    #[must_use]
    pub fn build(self) -> String {
        format!("{} {}\n", self.head, self.fields.join(","))
    }
}

fn escape_key(value: &str) -> String {
    escape(value, &[',', ' ', '='])
}

fn escape(value: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
