//! Hand-written scanner for the tempo-map text grammar.
//!
//! Per line: `[label:] (bars|*) [beats/denom] tempo [pattern] [volume]`
//! where `tempo` is `T`, `T1-T2` or `[t1,t2,...]`. `#` starts a comment,
//! blank lines are skipped. Errors carry 1-based line and column.

use super::{BeatType, Entry, Tempo, TempoMap};
use crate::{Error, Result};

/// Meter denominators that don't draw a warning.
const COMMON_DENOMS: [u32; 6] = [1, 2, 4, 8, 16, 32];

pub(super) fn parse_text(text: &str) -> Result<TempoMap> {
    let mut entries = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(entry) = parse_line(i + 1, line)? {
            entries.push(entry);
        }
    }
    TempoMap::from_entries(entries)
}

pub(super) fn parse_cmdline(line: &str) -> Result<TempoMap> {
    let trimmed = line.trim();
    // A bare tempo is shorthand for `* 4/4 TEMPO`.
    if let Ok(tempo) = trimmed.parse::<f32>() {
        if !(tempo > 0.0 && tempo.is_finite()) {
            return Err(Error::InvalidTempo(tempo));
        }
        return TempoMap::from_entries(vec![Entry {
            label: None,
            bars: None,
            beats: 4,
            denom: 4,
            tempo: Tempo::Constant(tempo),
            pattern: Vec::new(),
            volume: 1.0,
        }]);
    }
    match parse_line(1, line)? {
        Some(entry) => TempoMap::from_entries(vec![entry]),
        None => Err(Error::EmptyMap),
    }
}

/// Parse one line; `Ok(None)` for blank lines and comments.
fn parse_line(line_no: usize, line: &str) -> Result<Option<Entry>> {
    // Strip a trailing comment; '#' cannot occur inside any token.
    let line = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };

    let mut s = Scanner::new(line_no, line);
    s.skip_ws();
    if s.at_end() {
        return Ok(None);
    }

    let label = s.parse_label()?;
    let bars_col = s.pos;
    let bars = s.parse_bars()?;
    s.require_ws("bar count")?;

    let (beats, denom) = s.parse_meter(line_no)?;

    let tempo_col = s.pos;
    let tempo = s.parse_tempo()?;

    if bars.is_none() {
        match tempo {
            Tempo::Ramp { .. } => {
                return Err(s.err_at(
                    tempo_col,
                    "gradual tempo change requires a finite bar count",
                ));
            }
            Tempo::PerBeat(_) => {
                return Err(s.err_at(bars_col, "per-beat tempo requires a finite bar count"));
            }
            Tempo::Constant(_) => {}
        }
    }
    if let (Tempo::PerBeat(tempi), Some(bars)) = (&tempo, bars) {
        let expected = (bars * beats) as usize;
        if tempi.len() != expected {
            return Err(s.err_at(
                tempo_col,
                format!(
                    "per-beat tempo list has {} entries, section spans {} beats",
                    tempi.len(),
                    expected
                ),
            ));
        }
    }

    let pattern = s.parse_pattern(beats)?;
    let volume = s.parse_volume()?;

    s.skip_ws();
    if !s.at_end() {
        return Err(s.err("unexpected trailing input"));
    }

    Ok(Some(Entry {
        label,
        bars,
        beats,
        denom,
        tempo,
        pattern,
        volume,
    }))
}

struct Scanner<'a> {
    line_no: usize,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(line_no: usize, line: &'a str) -> Self {
        Self {
            line_no,
            bytes: line.as_bytes(),
            pos: 0,
        }
    }

    fn err(&self, reason: impl Into<String>) -> Error {
        self.err_at(self.pos, reason)
    }

    fn err_at(&self, pos: usize, reason: impl Into<String>) -> Error {
        Error::Parse {
            line: self.line_no,
            column: pos + 1,
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            self.bump();
        }
    }

    fn require_ws(&mut self, after: &str) -> Result<()> {
        if self.at_end() || !matches!(self.peek(), Some(b' ') | Some(b'\t')) {
            return Err(self.err(format!("expected whitespace after {}", after)));
        }
        self.skip_ws();
        Ok(())
    }

    fn take_uint(&mut self) -> Result<u32> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.pos == start {
            return Err(self.err("expected a number"));
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("scanner operates on ascii tokens")
            .parse()
            .map_err(|_| self.err_at(start, "number out of range"))
    }

    fn take_decimal(&mut self) -> Result<f32> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        if self.peek() == Some(b'.') {
            self.bump();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
        }
        let token = &self.bytes[start..self.pos];
        if !token.iter().any(|c| c.is_ascii_digit()) {
            return Err(self.err_at(start, "expected a number"));
        }
        std::str::from_utf8(token)
            .expect("scanner operates on ascii tokens")
            .parse()
            .map_err(|_| self.err_at(start, "invalid number"))
    }

    fn parse_label(&mut self) -> Result<Option<String>> {
        let start = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_ascii_alphabetic() || c == b'_') {
            return Ok(None);
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.bump();
        }
        if self.peek() != Some(b':') {
            return Err(self.err("expected ':' after label"));
        }
        let label = std::str::from_utf8(&self.bytes[start..self.pos])
            .expect("labels are ascii")
            .to_owned();
        self.bump();
        self.skip_ws();
        Ok(Some(label))
    }

    fn parse_bars(&mut self) -> Result<Option<u32>> {
        match self.peek() {
            Some(b'*') => {
                self.bump();
                Ok(None)
            }
            Some(c) if c.is_ascii_digit() => {
                let col = self.pos;
                let n = self.take_uint()?;
                if n == 0 {
                    return Err(self.err_at(col, "bar count must be positive"));
                }
                if self.peek() == Some(b'/') {
                    return Err(self.err_at(col, "missing bar count before meter"));
                }
                Ok(Some(n))
            }
            _ => Err(self.err("expected bar count or '*'")),
        }
    }

    fn parse_meter(&mut self, line_no: usize) -> Result<(u32, u32)> {
        let mark = self.pos;
        if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            return Ok((4, 4));
        }
        let beats_col = self.pos;
        let beats = self.take_uint()?;
        if self.peek() != Some(b'/') {
            // Not a meter after all; the digits belong to the tempo.
            self.pos = mark;
            return Ok((4, 4));
        }
        self.bump();
        let denom_col = self.pos;
        let denom = self.take_uint()?;
        if beats < 1 {
            return Err(self.err_at(beats_col, "meter numerator must be at least 1"));
        }
        if denom < 1 {
            return Err(self.err_at(denom_col, "meter denominator must be positive"));
        }
        if !COMMON_DENOMS.contains(&denom) {
            log::warn!("line {}: unusual meter denominator {}", line_no, denom);
        }
        self.require_ws("meter")?;
        Ok((beats, denom))
    }

    fn parse_tempo(&mut self) -> Result<Tempo> {
        if self.peek() == Some(b'[') {
            self.bump();
            let mut tempi = Vec::new();
            loop {
                self.skip_ws();
                let col = self.pos;
                let t = self.take_decimal()?;
                if !(t > 0.0 && t.is_finite()) {
                    return Err(self.err_at(col, "tempo must be positive"));
                }
                tempi.push(t);
                self.skip_ws();
                match self.peek() {
                    Some(b',') => self.bump(),
                    Some(b']') => {
                        self.bump();
                        return Ok(Tempo::PerBeat(tempi));
                    }
                    _ => return Err(self.err("expected ',' or ']' in tempo list")),
                }
            }
        }

        let col = self.pos;
        let t1 = self.take_decimal()?;
        if !(t1 > 0.0 && t1.is_finite()) {
            return Err(self.err_at(col, "tempo must be positive"));
        }
        if self.peek() != Some(b'-') {
            return Ok(Tempo::Constant(t1));
        }
        self.bump();
        let col = self.pos;
        let t2 = self.take_decimal()?;
        if !(t2 > 0.0 && t2.is_finite()) {
            return Err(self.err_at(col, "tempo must be positive"));
        }
        if t1 == t2 {
            Ok(Tempo::Constant(t1))
        } else {
            Ok(Tempo::Ramp { from: t1, to: t2 })
        }
    }

    fn parse_pattern(&mut self, beats: u32) -> Result<Vec<BeatType>> {
        self.skip_ws();
        let looks_like_pattern = match self.peek() {
            Some(b'X') | Some(b'x') => true,
            // A lone '.' run is a pattern; '.5' is a volume.
            Some(b'.') => !matches!(self.bytes.get(self.pos + 1), Some(c) if c.is_ascii_digit()),
            _ => false,
        };
        if !looks_like_pattern {
            return Ok(Vec::new());
        }

        let col = self.pos;
        let mut pattern = Vec::new();
        loop {
            match self.peek() {
                Some(b'X') => pattern.push(BeatType::Emphasis),
                Some(b'x') => pattern.push(BeatType::Normal),
                Some(b'.') => pattern.push(BeatType::Silent),
                _ => break,
            }
            self.bump();
        }
        if pattern.len() != beats as usize {
            return Err(self.err_at(
                col,
                format!(
                    "pattern has {} beats, meter expects {}",
                    pattern.len(),
                    beats
                ),
            ));
        }
        Ok(pattern)
    }

    fn parse_volume(&mut self) -> Result<f32> {
        self.skip_ws();
        if self.at_end() {
            return Ok(1.0);
        }
        let col = self.pos;
        let v = self.take_decimal()?;
        if !(0.0..=1.0).contains(&v) {
            return Err(self.err_at(col, "volume out of range (0.0-1.0)"));
        }
        Ok(v)
    }
}
