//! Line classifier and record parser
//!
//! A single left-to-right pass over the log. Every line is classified in a
//! fixed order:
//!
//! 1. `<Label>: <value>` scalar lines (Temperature, Humidity, Pressure, Gas)
//! 2. `<Bank> Values:` headers, which open a group consuming the next four
//!    lines as `Channel <n>: <v>`
//! 3. `<Bank> Channel <n>: <v>` inline channel lines
//!
//! Anything else becomes a [`ParseWarning`] and the pass continues. Each
//! field keeps its own sequence in encounter order; [`ParsedLog::readings`]
//! aligns them positionally.

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize, Serializer};
use tracing::{debug, warn};

use crate::error::{ConfigurationError, ParseError, TruncatedRecordError};
use crate::extract::extract_number;
use crate::types::{Bank, BankRecord, CHANNELS_PER_BANK, ChannelBank, Field, SensorReading};

static BANK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<bank>\S+)\s+Values:$").expect("bank header pattern is valid")
});

static INLINE_CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<bank>\S+)\s+(?P<body>Channel\b.*)$").expect("inline channel pattern is valid")
});

static CHANNEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Channel\s+(?P<channel>\d+):\s*(?P<value>[+-]?\d+)")
        .expect("channel pattern is valid")
});

// ═══════════════════════════════════════════════════════════════════════════════
// BANK ALIASES
// ═══════════════════════════════════════════════════════════════════════════════

/// Names under which the logger reports each ADC bank
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAliases {
    #[serde(default)]
    pub a: Vec<String>,
    #[serde(default)]
    pub b: Vec<String>,
}

impl Default for BankAliases {
    fn default() -> Self {
        Self {
            a: vec!["ADC72".to_string(), "ADC1".to_string()],
            b: vec!["ADC73".to_string(), "ADC2".to_string()],
        }
    }
}

impl BankAliases {
    pub fn new(a: Vec<String>, b: Vec<String>) -> Self {
        Self { a, b }
    }

    pub fn aliases(&self, bank: Bank) -> &[String] {
        match bank {
            Bank::A => &self.a,
            Bank::B => &self.b,
        }
    }

    /// Bank reported under `name`, matched exactly
    pub fn resolve(&self, name: &str) -> Option<Bank> {
        Bank::ALL
            .into_iter()
            .find(|&bank| self.aliases(bank).iter().any(|alias| alias == name))
    }

    /// First alias of the bank, or `bank_<key>` when none is configured
    pub fn primary(&self, bank: Bank) -> String {
        self.aliases(bank)
            .first()
            .cloned()
            .unwrap_or_else(|| format!("bank_{}", bank.key()))
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let mut seen: Vec<&str> = Vec::new();
        for alias in self.a.iter().chain(&self.b) {
            if seen.contains(&alias.as_str()) {
                return Err(ConfigurationError::DuplicateBankAlias(alias.clone()));
            }
            seen.push(alias);
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSE OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// A skipped line, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    /// 1-based line number
    pub line: usize,
    pub content: String,
    pub error: ParseError,
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {} ({:?})", self.line, self.error, self.content)
    }
}

/// What to do with a bank group cut short by the end of input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TruncationPolicy {
    /// Drop the incomplete group
    #[default]
    Discard,
    /// Keep the group with missing channels set to zero
    ZeroPad,
}

/// Key of one exported value sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesKey {
    Field(Field),
    Channel { bank: Bank, channel: usize },
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesKey::Field(field) => write!(f, "{field}"),
            SeriesKey::Channel { bank, channel } => write!(f, "{bank}_channel_{channel}"),
        }
    }
}

impl Serialize for SeriesKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One field's values in encounter order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: SeriesKey,
    pub values: Vec<f64>,
}

/// Independently ordered field sequences produced by one parse
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParsedLog {
    pub temperature: Vec<f64>,
    pub humidity: Vec<f64>,
    pub pressure: Vec<f64>,
    pub gas: Vec<f64>,
    pub bank_a: Vec<BankRecord>,
    pub bank_b: Vec<BankRecord>,
    pub warnings: Vec<ParseWarning>,
    /// Lines fed to the parser, blank ones included
    pub lines_read: usize,
}

impl ParsedLog {
    pub fn values(&self, field: Field) -> &[f64] {
        match field {
            Field::Temperature => &self.temperature,
            Field::Humidity => &self.humidity,
            Field::Pressure => &self.pressure,
            Field::Gas => &self.gas,
        }
    }

    pub fn banks(&self, bank: Bank) -> &[BankRecord] {
        match bank {
            Bank::A => &self.bank_a,
            Bank::B => &self.bank_b,
        }
    }

    fn push_value(&mut self, field: Field, value: f64) {
        match field {
            Field::Temperature => self.temperature.push(value),
            Field::Humidity => self.humidity.push(value),
            Field::Pressure => self.pressure.push(value),
            Field::Gas => self.gas.push(value),
        }
    }

    fn push_bank(&mut self, bank: Bank, record: BankRecord) {
        debug!(%bank, received = record.received(), "bank group closed");
        match bank {
            Bank::A => self.bank_a.push(record),
            Bank::B => self.bank_b.push(record),
        }
    }

    /// Length of the longest sequence
    pub fn reading_count(&self) -> usize {
        Field::ALL
            .into_iter()
            .map(|f| self.values(f).len())
            .chain(Bank::ALL.into_iter().map(|b| self.banks(b).len()))
            .max()
            .unwrap_or(0)
    }

    /// Aligns the sequences into readings: the i-th value of every field
    /// belongs to reading i, shorter sequences leave the field `None`
    pub fn readings(&self) -> Vec<SensorReading> {
        (0..self.reading_count())
            .map(|index| {
                let mut reading = SensorReading::new(index);
                for field in Field::ALL {
                    reading.set_field(field, self.values(field).get(index).copied());
                }
                for bank in Bank::ALL {
                    if let Some(record) = self.banks(bank).get(index) {
                        *reading.bank_mut(bank) = ChannelBank::from(*record);
                    }
                }
                reading
            })
            .collect()
    }

    /// Per-field sequences; channel sequences hold only the values reported
    pub fn series(&self) -> Vec<Series> {
        let mut series: Vec<Series> = Field::ALL
            .into_iter()
            .map(|field| Series {
                key: SeriesKey::Field(field),
                values: self.values(field).to_vec(),
            })
            .collect();

        for bank in Bank::ALL {
            for channel in 0..CHANNELS_PER_BANK {
                series.push(Series {
                    key: SeriesKey::Channel { bank, channel },
                    values: self
                        .banks(bank)
                        .iter()
                        .filter_map(|record| record.get(channel))
                        .map(f64::from)
                        .collect(),
                });
            }
        }

        series
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSER
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
struct OpenGroup {
    bank: Bank,
    header_line: usize,
    consumed: usize,
    record: BankRecord,
}

#[derive(Debug)]
enum State {
    Idle,
    Group(OpenGroup),
}

/// Incremental record parser
///
/// Feed lines in order with [`feed`](Self::feed), then call
/// [`finish`](Self::finish).
#[derive(Debug)]
pub struct LogParser {
    aliases: BankAliases,
    state: State,
    line_number: usize,
    pending_inline: [Option<BankRecord>; 2],
    log: ParsedLog,
}

impl LogParser {
    pub fn new(aliases: BankAliases) -> Self {
        Self {
            aliases,
            state: State::Idle,
            line_number: 0,
            pending_inline: [None, None],
            log: ParsedLog::default(),
        }
    }

    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Warnings recorded so far
    pub fn warnings(&self) -> &[ParseWarning] {
        &self.log.warnings
    }

    pub fn feed(&mut self, line: &str) {
        self.line_number += 1;
        let text = line.trim();

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Group(mut group) => {
                self.consume_group_line(&mut group, line, text);
                if group.consumed == CHANNELS_PER_BANK {
                    self.log.push_bank(group.bank, group.record);
                } else {
                    self.state = State::Group(group);
                }
            }
            State::Idle => self.classify(line, text),
        }
    }

    /// Ends the pass
    ///
    /// Pending inline records are emitted as they stand. A `Values:` group
    /// still waiting for channel lines yields a [`TruncatedRecordError`].
    pub fn finish(mut self) -> Result<ParsedLog, TruncatedRecordError> {
        for bank in Bank::ALL {
            self.flush_inline(bank);
        }
        self.log.lines_read = self.line_number;

        match std::mem::replace(&mut self.state, State::Idle) {
            State::Idle => Ok(self.log),
            State::Group(group) => {
                warn!(
                    bank = %group.bank,
                    header_line = group.header_line,
                    consumed = group.consumed,
                    "input ended inside a bank group"
                );
                Err(TruncatedRecordError {
                    bank: group.bank,
                    header_line: group.header_line,
                    consumed: group.consumed,
                    received: group.record,
                    partial: Box::new(self.log),
                })
            }
        }
    }

    fn classify(&mut self, line: &str, text: &str) {
        if text.is_empty() {
            return;
        }

        if let Some((label, rest)) = text.split_once(':') {
            if let Some(field) = Field::from_label(label.trim()) {
                match extract_number(rest) {
                    Ok(value) => self.log.push_value(field, value),
                    Err(error) => self.warn(line, error),
                }
                return;
            }
        }

        if let Some(caps) = BANK_HEADER.captures(text) {
            let name = &caps["bank"];
            match self.aliases.resolve(name) {
                Some(bank) => {
                    self.flush_inline(bank);
                    self.state = State::Group(OpenGroup {
                        bank,
                        header_line: self.line_number,
                        consumed: 0,
                        record: BankRecord::default(),
                    });
                }
                None => self.warn(line, ParseError::UnknownBank(name.to_string())),
            }
            return;
        }

        if let Some(caps) = INLINE_CHANNEL.captures(text) {
            let name = &caps["bank"];
            let Some(bank) = self.aliases.resolve(name) else {
                self.warn(line, ParseError::UnknownBank(name.to_string()));
                return;
            };
            match parse_channel(&caps["body"]) {
                Ok((channel, value)) => self.push_inline(bank, channel, value),
                Err(error) => self.warn(line, error),
            }
            return;
        }

        self.warn(line, ParseError::UnrecognizedLine);
    }

    fn consume_group_line(&mut self, group: &mut OpenGroup, line: &str, text: &str) {
        group.consumed += 1;
        match parse_channel(text) {
            Ok((channel, value)) => {
                let slot = &mut group.record.channels[channel];
                if slot.is_some() {
                    self.warn(
                        line,
                        ParseError::DuplicateChannel {
                            bank: group.bank,
                            channel,
                        },
                    );
                } else {
                    *slot = Some(value);
                }
            }
            Err(error) => self.warn(line, error),
        }
    }

    fn push_inline(&mut self, bank: Bank, channel: usize, value: u32) {
        let pending = &mut self.pending_inline[bank.index()];

        // A repeated channel starts the next reading
        if pending
            .as_ref()
            .is_some_and(|record| record.channels[channel].is_some())
        {
            if let Some(done) = pending.take() {
                self.log.push_bank(bank, done);
            }
        }

        let record = pending.get_or_insert_with(BankRecord::default);
        record.channels[channel] = Some(value);

        if record.is_complete() {
            if let Some(done) = pending.take() {
                self.log.push_bank(bank, done);
            }
        }
    }

    fn flush_inline(&mut self, bank: Bank) {
        if let Some(record) = self.pending_inline[bank.index()].take() {
            self.log.push_bank(bank, record);
        }
    }

    fn warn(&mut self, line: &str, error: ParseError) {
        let content = line.trim_end_matches(['\r', '\n']).to_string();
        warn!(line = self.line_number, %error, content = %content, "skipping log line");
        self.log.warnings.push(ParseWarning {
            line: self.line_number,
            content,
            error,
        });
    }
}

/// Parses `Channel <n>: <v>` into a checked `(channel, value)` pair
fn parse_channel(text: &str) -> Result<(usize, u32), ParseError> {
    let caps = CHANNEL.captures(text.trim()).ok_or(ParseError::MalformedChannel)?;
    channel_from_captures(&caps)
}

fn channel_from_captures(caps: &Captures<'_>) -> Result<(usize, u32), ParseError> {
    let literal = &caps["channel"];
    // All digits, so a failed parse can only be an overflow
    let index = literal
        .parse::<usize>()
        .ok()
        .filter(|&index| index < CHANNELS_PER_BANK)
        .ok_or_else(|| ParseError::ChannelOutOfRange(literal.to_string()))?;
    let value: u32 = caps["value"]
        .parse()
        .map_err(|_| ParseError::MalformedChannel)?;

    Ok((index, value))
}

impl TruncatedRecordError {
    /// Log parsed up to the end of input, without the incomplete group
    pub fn partial(&self) -> &ParsedLog {
        &self.partial
    }

    /// Resolves the truncation according to `policy`
    pub fn recover(self, policy: TruncationPolicy) -> ParsedLog {
        let mut log = *self.partial;
        if policy == TruncationPolicy::ZeroPad {
            log.push_bank(self.bank, self.received.zero_padded());
        }
        log
    }
}

/// Parses a finite sequence of lines
pub fn parse_lines<I, S>(lines: I, aliases: &BankAliases) -> Result<ParsedLog, TruncatedRecordError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = LogParser::new(aliases.clone());
    for line in lines {
        parser.feed(line.as_ref());
    }
    parser.finish()
}

/// Parses a whole capture held in memory
pub fn parse_str(text: &str, aliases: &BankAliases) -> Result<ParsedLog, TruncatedRecordError> {
    parse_lines(text.lines(), aliases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParsedLog {
        parse_str(text, &BankAliases::default()).unwrap()
    }

    #[test]
    fn test_scalar_lines() {
        let log = parse("Temperature: 22.5 C\nHumidity: 65\nPressure: 1013.2 hPa\nGas: 5120 Ohms\n");
        assert_eq!(log.temperature, vec![22.5]);
        assert_eq!(log.humidity, vec![65.0]);
        assert_eq!(log.pressure, vec![1013.2]);
        assert_eq!(log.gas, vec![5120.0]);
        assert!(log.warnings.is_empty());
        assert_eq!(log.lines_read, 4);
    }

    #[test]
    fn test_values_group() {
        let log = parse("ADC72 Values:\nChannel 0: 10\nChannel 1: 20\nChannel 2: 30\nChannel 3: 40\n");
        assert_eq!(log.bank_a, vec![BankRecord::complete([10, 20, 30, 40])]);
        assert!(log.bank_b.is_empty());
    }

    #[test]
    fn test_group_channel_order_follows_labels() {
        let log = parse("ADC73 Values:\nChannel 3: 4\nChannel 1: 2\nChannel 0: 1\nChannel 2: 3\n");
        assert_eq!(log.bank_b, vec![BankRecord::complete([1, 2, 3, 4])]);
    }

    #[test]
    fn test_group_consumes_exactly_four_lines() {
        let log = parse("ADC72 Values:\nChannel 0: 1\nTemperature: 20\nChannel 2: 3\nChannel 3: 4\nTemperature: 21\n");
        assert_eq!(log.bank_a, vec![BankRecord::new([Some(1), None, Some(3), Some(4)])]);
        assert_eq!(log.temperature, vec![21.0]);
        assert_eq!(log.warnings.len(), 1);
        assert_eq!(log.warnings[0].line, 3);
        assert_eq!(log.warnings[0].error, ParseError::MalformedChannel);
    }

    #[test]
    fn test_group_duplicate_channel_keeps_first() {
        let log = parse("ADC72 Values:\nChannel 0: 1\nChannel 0: 9\nChannel 2: 3\nChannel 3: 4\n");
        assert_eq!(log.bank_a[0].channels, [Some(1), None, Some(3), Some(4)]);
        assert_eq!(
            log.warnings[0].error,
            ParseError::DuplicateChannel { bank: Bank::A, channel: 0 }
        );
    }

    #[test]
    fn test_channel_out_of_range() {
        let log = parse("ADC72 Values:\nChannel 4: 1\nChannel 1: 2\nChannel 2: 3\nChannel 3: 4\n");
        assert_eq!(log.warnings[0].error, ParseError::ChannelOutOfRange("4".into()));
        assert_eq!(log.bank_a[0].received(), 3);
    }

    #[test]
    fn test_inline_lines_fill_one_record() {
        let log = parse("ADC1 Channel 0: 1\nADC1 Channel 1: 2\nADC1 Channel 2: 3\nADC1 Channel 3: 4\n");
        assert_eq!(log.bank_a, vec![BankRecord::complete([1, 2, 3, 4])]);
    }

    #[test]
    fn test_inline_repeat_starts_next_record() {
        let log = parse("ADC2 Channel 0: 1\nADC2 Channel 1: 2\nADC2 Channel 0: 5\n");
        assert_eq!(
            log.bank_b,
            vec![
                BankRecord::new([Some(1), Some(2), None, None]),
                BankRecord::new([Some(5), None, None, None]),
            ]
        );
    }

    #[test]
    fn test_inline_partial_flushed_at_end() {
        let log = parse("ADC1 Channel 0: 32768\n");
        assert_eq!(log.bank_a, vec![BankRecord::new([Some(32768), None, None, None])]);
    }

    #[test]
    fn test_values_header_flushes_pending_inline() {
        let log = parse(
            "ADC1 Channel 2: 7\nADC72 Values:\nChannel 0: 1\nChannel 1: 2\nChannel 2: 3\nChannel 3: 4\n",
        );
        assert_eq!(log.bank_a.len(), 2);
        assert_eq!(log.bank_a[0].channels, [None, None, Some(7), None]);
        assert!(log.bank_a[1].is_complete());
    }

    #[test]
    fn test_unrecognized_and_unknown_bank_lines() {
        let log = parse("hello\nADC99 Values:\nADC99 Channel 0: 3\nTemperature: ??\n\n   \n");
        let errors: Vec<_> = log.warnings.iter().map(|w| w.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                ParseError::UnrecognizedLine,
                ParseError::UnknownBank("ADC99".into()),
                ParseError::UnknownBank("ADC99".into()),
                ParseError::NoNumericLiteral("??".into()),
            ]
        );
        assert_eq!(log.warnings[0].content, "hello");
        assert_eq!(log.lines_read, 6);
    }

    #[test]
    fn test_oversized_channel_index_is_out_of_range() {
        let log = parse(concat!(
            "ADC1 Channel 99999999999: 1\n",
            "ADC72 Values:\n",
            "Channel 123456789012345678901234: 5\n",
            "Channel 1: 2\nChannel 2: 3\nChannel 3: 4\n",
        ));
        let errors: Vec<_> = log.warnings.iter().map(|w| w.error.clone()).collect();
        assert_eq!(
            errors,
            vec![
                ParseError::ChannelOutOfRange("99999999999".into()),
                ParseError::ChannelOutOfRange("123456789012345678901234".into()),
            ]
        );
        assert_eq!(log.bank_a, vec![BankRecord::new([None, Some(2), Some(3), Some(4)])]);
    }

    #[test]
    fn test_negative_channel_value_is_malformed() {
        let log = parse("ADC1 Channel 1: -5\n");
        assert_eq!(log.warnings[0].error, ParseError::MalformedChannel);
        assert!(log.bank_a.is_empty());
    }

    #[test]
    fn test_raw_above_full_scale_is_kept() {
        let log = parse("ADC1 Channel 0: 70000\n");
        assert_eq!(log.bank_a[0].get(0), Some(70000));
    }

    #[test]
    fn test_truncated_group() {
        let err = parse_str(
            "Temperature: 20\nADC73 Values:\nChannel 0: 11\nChannel 1: 12\n",
            &BankAliases::default(),
        )
        .unwrap_err();

        assert_eq!(err.bank, Bank::B);
        assert_eq!(err.header_line, 2);
        assert_eq!(err.consumed, 2);
        assert_eq!(err.received.channels, [Some(11), Some(12), None, None]);
        assert_eq!(err.partial().temperature, vec![20.0]);
        assert!(err.partial().bank_b.is_empty());
    }

    #[test]
    fn test_truncated_recover_policies() {
        let text = "ADC72 Values:\nChannel 0: 1\n";
        let aliases = BankAliases::default();

        let discarded = parse_str(text, &aliases).unwrap_err().recover(TruncationPolicy::Discard);
        assert!(discarded.bank_a.is_empty());

        let padded = parse_str(text, &aliases).unwrap_err().recover(TruncationPolicy::ZeroPad);
        assert_eq!(padded.bank_a, vec![BankRecord::complete([1, 0, 0, 0])]);
    }

    #[test]
    fn test_alignment_pads_short_fields() {
        let log = parse("Temperature: 20\nTemperature: 21\nHumidity: 50\n");
        let readings = log.readings();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].humidity, Some(50.0));
        assert_eq!(readings[1].humidity, None);
        assert_eq!(readings[1].temperature, Some(21.0));
        assert_eq!(readings[1].bank_a.raw, [None; 4]);
    }

    #[test]
    fn test_series_keys() {
        let log = parse("Gas: 3\nADC1 Channel 1: 9\n");
        let series = log.series();
        assert_eq!(series.len(), 12);
        assert_eq!(series[3].key.to_string(), "gas");
        assert_eq!(series[3].values, vec![3.0]);

        let channel = series
            .iter()
            .find(|s| s.key == SeriesKey::Channel { bank: Bank::A, channel: 1 })
            .unwrap();
        assert_eq!(channel.values, vec![9.0]);
        assert_eq!(channel.key.to_string(), "a_channel_1");
    }

    #[test]
    fn test_bank_aliases() {
        let aliases = BankAliases::default();
        assert_eq!(aliases.resolve("ADC72"), Some(Bank::A));
        assert_eq!(aliases.resolve("ADC2"), Some(Bank::B));
        assert_eq!(aliases.resolve("adc72"), None);
        assert_eq!(aliases.primary(Bank::B), "ADC73");
        assert!(aliases.validate().is_ok());

        let empty = BankAliases::new(Vec::new(), Vec::new());
        assert_eq!(empty.primary(Bank::A), "bank_a");

        let clash = BankAliases::new(vec!["X".into()], vec!["X".into()]);
        assert_eq!(
            clash.validate(),
            Err(ConfigurationError::DuplicateBankAlias("X".into()))
        );
    }

    #[test]
    fn test_incremental_feed() {
        let mut parser = LogParser::new(BankAliases::default());
        parser.feed("Humidity: 40");
        parser.feed("junk");
        assert_eq!(parser.lines_read(), 2);
        assert_eq!(parser.warnings().len(), 1);

        let log = parser.finish().unwrap();
        assert_eq!(log.humidity, vec![40.0]);
    }
}
