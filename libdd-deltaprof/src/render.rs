// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Turns ordered delta samples into bytes on the caller's sink.

use crate::pprof::{
    self, DurationNanosField, FunctionField, LocationField, PeriodField, PeriodTypeField,
    SampleField, SampleTypeField, StringOffset, StringTable, TimeNanosField,
};
use crate::{DeltaProfileError, DeltaSample, Symbolizer};
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Names of the two values carried by every sample.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SampleLabels<'a> {
    /// What is being counted, e.g. "contentions".
    pub count: &'a str,
    /// What the magnitude measures, e.g. "delay".
    pub value: &'a str,
}

impl SampleLabels<'static> {
    pub const CONTENTION: SampleLabels<'static> = SampleLabels {
        count: "contentions",
        value: "delay",
    };
}

/// The period of time a delta profile covers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProfileWindow {
    /// When the profile's snapshot was taken.
    pub end: SystemTime,
    /// Time since the previous snapshot, `None` for the first profile.
    pub duration: Option<Duration>,
}

/// Writes a delta profile in some interchange format.
pub trait Renderer {
    /// `samples` are already ordered by descending delay. Renderers may write
    /// to `sink` incrementally; on error its contents are undefined.
    fn render<W: Write>(
        &self,
        sink: &mut W,
        samples: &[DeltaSample],
        labels: SampleLabels<'_>,
        window: ProfileWindow,
    ) -> Result<(), DeltaProfileError>;
}

impl<T: Renderer> Renderer for Arc<T> {
    fn render<W: Write>(
        &self,
        sink: &mut W,
        samples: &[DeltaSample],
        labels: SampleLabels<'_>,
        window: ProfileWindow,
    ) -> Result<(), DeltaProfileError> {
        (**self).render(sink, samples, labels, window)
    }
}

/// How the pprof bytes are compressed before reaching the sink.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    None,
    /// What `go tool pprof` and most pprof consumers expect.
    #[default]
    Gzip,
    /// LZ4 frame format.
    Lz4,
}

/// Renders samples as a pprof `Profile` protobuf.
///
/// The profile has two sample types, `(count label, "count")` and
/// `(value label, "nanoseconds")`, and a period of one count. Each distinct
/// address becomes one location. With a [`Symbolizer`], locations that
/// resolve also get a line and function.
#[derive(Clone, Default)]
pub struct PprofRenderer {
    compression: Compression,
    symbolizer: Option<Arc<dyn Symbolizer>>,
}

impl fmt::Debug for PprofRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PprofRenderer")
            .field("compression", &self.compression)
            .field("symbolizer", &self.symbolizer.is_some())
            .finish()
    }
}

impl PprofRenderer {
    pub fn new(compression: Compression) -> Self {
        Self {
            compression,
            symbolizer: None,
        }
    }

    pub fn with_symbolizer(mut self, symbolizer: Arc<dyn Symbolizer>) -> Self {
        self.symbolizer = Some(symbolizer);
        self
    }

    /// Encodes the uncompressed protobuf into `buffer`.
    pub fn encode(
        &self,
        buffer: &mut Vec<u8>,
        samples: &[DeltaSample],
        labels: SampleLabels<'_>,
        window: ProfileWindow,
    ) -> Result<(), DeltaProfileError> {
        let mut encoder = ProfileEncoder::new(buffer, self.symbolizer.as_deref())?;
        encoder.header(labels)?;
        for sample in samples {
            encoder.sample(sample)?;
        }
        encoder.window(window)?;
        Ok(())
    }
}

impl Renderer for PprofRenderer {
    fn render<W: Write>(
        &self,
        sink: &mut W,
        samples: &[DeltaSample],
        labels: SampleLabels<'_>,
        window: ProfileWindow,
    ) -> Result<(), DeltaProfileError> {
        let mut buffer = Vec::new();
        self.encode(&mut buffer, samples, labels, window)?;

        match self.compression {
            Compression::None => sink.write_all(&buffer)?,
            Compression::Gzip => {
                let mut encoder =
                    flate2::write::GzEncoder::new(sink, flate2::Compression::default());
                encoder.write_all(&buffer)?;
                encoder.finish()?;
            }
            Compression::Lz4 => {
                let mut encoder = lz4_flex::frame::FrameEncoder::new(sink);
                encoder.write_all(&buffer)?;
                encoder.finish().map_err(io::Error::other)?;
            }
        }
        Ok(())
    }
}

/// Compacts addresses and functions to ids `1..=N`, writing each one the
/// first time a sample references it.
struct ProfileEncoder<'b, 's> {
    buffer: &'b mut Vec<u8>,
    strings: StringTable<'s>,
    symbolizer: Option<&'s dyn Symbolizer>,
    locations: FxHashMap<u64, u64>,
    functions: FxHashMap<(StringOffset, StringOffset, StringOffset), u64>,
    location_ids: Vec<u64>,
}

impl<'b, 's> ProfileEncoder<'b, 's> {
    fn new(buffer: &'b mut Vec<u8>, symbolizer: Option<&'s dyn Symbolizer>) -> io::Result<Self> {
        let strings = StringTable::new(buffer)?;
        Ok(Self {
            buffer,
            strings,
            symbolizer,
            locations: FxHashMap::default(),
            functions: FxHashMap::default(),
            location_ids: Vec::new(),
        })
    }

    fn header(&mut self, labels: SampleLabels<'s>) -> Result<(), DeltaProfileError> {
        let count_type = self.strings.intern(self.buffer, labels.count)?;
        let count_unit = self.strings.intern(self.buffer, "count")?;
        let value_type = self.strings.intern(self.buffer, labels.value)?;
        let value_unit = self.strings.intern(self.buffer, "nanoseconds")?;

        let count = pprof::ValueType::new(count_type, count_unit);
        SampleTypeField::from(count).encode(self.buffer)?;
        SampleTypeField::from(pprof::ValueType::new(value_type, value_unit)).encode(self.buffer)?;
        PeriodTypeField::from(count).encode(self.buffer)?;
        PeriodField::from(1).encode(self.buffer)?;
        Ok(())
    }

    fn sample(&mut self, sample: &DeltaSample) -> Result<(), DeltaProfileError> {
        let mut location_ids = std::mem::take(&mut self.location_ids);
        location_ids.clear();
        for &address in sample.stack.addresses() {
            location_ids.push(self.location_id(address)?);
        }
        let values = [sample.count, sample.nanos];
        let result = SampleField::from(pprof::Sample::new(&location_ids, &values))
            .encode(self.buffer)
            .map_err(DeltaProfileError::from);
        self.location_ids = location_ids;
        result
    }

    fn location_id(&mut self, address: u64) -> Result<u64, DeltaProfileError> {
        if let Some(id) = self.locations.get(&address) {
            return Ok(*id);
        }
        let id = self.locations.len() as u64 + 1;

        let line = match self.symbolizer.and_then(|s| s.symbolize(address)) {
            Some(frame) => {
                let function_id =
                    self.function_id(frame.function, frame.system_name, frame.filename)?;
                pprof::Line {
                    function_id: function_id.into(),
                    lineno: frame.line.into(),
                }
            }
            None => pprof::Line::default(),
        };
        let location = pprof::Location {
            id: id.into(),
            address: address.into(),
            line: line.into(),
            ..Default::default()
        };
        LocationField::from(location).encode(self.buffer)?;
        self.locations.insert(address, id);
        Ok(id)
    }

    fn function_id(
        &mut self,
        name: String,
        system_name: Option<String>,
        filename: String,
    ) -> Result<u64, DeltaProfileError> {
        let system_name = match system_name {
            Some(system_name) => self.strings.intern(self.buffer, system_name)?,
            None => self.strings.intern(self.buffer, name.clone())?,
        };
        let name = self.strings.intern(self.buffer, name)?;
        let filename = self.strings.intern(self.buffer, filename)?;

        let key = (name, system_name, filename);
        if let Some(id) = self.functions.get(&key) {
            return Ok(*id);
        }
        let id = self.functions.len() as u64 + 1;
        let function = pprof::Function {
            id: id.into(),
            name: name.into(),
            system_name: system_name.into(),
            filename: filename.into(),
        };
        FunctionField::from(function).encode(self.buffer)?;
        self.functions.insert(key, id);
        Ok(id)
    }

    fn window(&mut self, window: ProfileWindow) -> Result<(), DeltaProfileError> {
        let time_nanos = window
            .end
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|d| i64::try_from(d.as_nanos()).ok())
            .unwrap_or_default();
        let duration_nanos = window
            .duration
            .and_then(|d| i64::try_from(d.as_nanos()).ok())
            .unwrap_or_default();
        TimeNanosField::from(time_nanos).encode(self.buffer)?;
        DurationNanosField::from(duration_nanos).encode(self.buffer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pprof::prost_impls;
    use crate::{Frame, StackTrace, SymbolTable};
    use prost::Message;
    use std::io::Read;

    fn samples() -> Vec<DeltaSample> {
        vec![
            DeltaSample {
                stack: StackTrace::from([0x30, 0x10]),
                count: 5,
                nanos: 40,
            },
            DeltaSample {
                stack: StackTrace::from([0x20, 0x10]),
                count: 2,
                nanos: 20,
            },
        ]
    }

    fn window() -> ProfileWindow {
        ProfileWindow {
            end: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
            duration: Some(Duration::from_secs(10)),
        }
    }

    fn decode(renderer: &PprofRenderer, samples: &[DeltaSample]) -> prost_impls::Profile {
        let mut buffer = Vec::new();
        renderer
            .encode(&mut buffer, samples, SampleLabels::CONTENTION, window())
            .unwrap();
        prost_impls::Profile::decode(buffer.as_slice()).unwrap()
    }

    #[test]
    fn header_and_samples() {
        let profile = decode(&PprofRenderer::default(), &samples());

        let types: Vec<_> = profile
            .sample_types
            .iter()
            .map(|vt| (profile.string(vt.r#type), profile.string(vt.unit)))
            .collect();
        assert_eq!(types, [("contentions", "count"), ("delay", "nanoseconds")]);
        let period_type = profile.period_type.unwrap();
        assert_eq!(profile.string(period_type.r#type), "contentions");
        assert_eq!(profile.period, 1);
        assert_eq!(profile.time_nanos, 1_700_000_000 * 1_000_000_000);
        assert_eq!(profile.duration_nanos, 10_000_000_000);

        assert_eq!(profile.samples.len(), 2);
        assert_eq!(profile.samples[0].values, [5, 40]);
        assert_eq!(profile.samples[1].values, [2, 20]);

        // The shared frame 0x10 becomes a single location.
        assert_eq!(profile.locations.len(), 3);
        let address_of = |id: u64| {
            profile
                .locations
                .iter()
                .find(|l| l.id == id)
                .map(|l| l.address)
                .unwrap()
        };
        let stacks: Vec<Vec<u64>> = profile
            .samples
            .iter()
            .map(|s| s.location_ids.iter().map(|id| address_of(*id)).collect())
            .collect();
        assert_eq!(stacks, [vec![0x30, 0x10], vec![0x20, 0x10]]);
        assert!(profile.locations.iter().all(|l| l.lines.is_empty()));
        assert!(profile.functions.is_empty());
    }

    #[test]
    fn symbolized_locations_get_functions() {
        let symbols: SymbolTable = [
            (
                0x10,
                Frame {
                    function: "main".into(),
                    filename: "src/main.rs".into(),
                    line: 3,
                    ..Default::default()
                },
            ),
            (
                0x30,
                Frame {
                    function: "worker::lock".into(),
                    system_name: Some("_ZN6worker4lock".into()),
                    filename: "src/worker.rs".into(),
                    line: 42,
                },
            ),
        ]
        .into_iter()
        .collect();
        let renderer = PprofRenderer::default().with_symbolizer(Arc::new(symbols));
        let profile = decode(&renderer, &samples());

        assert_eq!(profile.functions.len(), 2);
        let lock = profile
            .locations
            .iter()
            .find(|l| l.address == 0x30)
            .unwrap();
        let line = lock.lines[0];
        assert_eq!(line.line, 42);
        let function = profile
            .functions
            .iter()
            .find(|f| f.id == line.function_id)
            .unwrap();
        assert_eq!(profile.string(function.name), "worker::lock");
        assert_eq!(profile.string(function.system_name), "_ZN6worker4lock");
        assert_eq!(profile.string(function.filename), "src/worker.rs");

        let unresolved = profile
            .locations
            .iter()
            .find(|l| l.address == 0x20)
            .unwrap();
        assert!(unresolved.lines.is_empty());
    }

    #[test]
    fn empty_profile_still_has_a_header() {
        let profile = decode(&PprofRenderer::default(), &[]);
        assert_eq!(profile.sample_types.len(), 2);
        assert!(profile.samples.is_empty());
        assert_eq!(profile.string_table[0], "");
    }

    #[test]
    fn compressions() {
        let samples = samples();
        let mut expected = Vec::new();
        PprofRenderer::default()
            .encode(&mut expected, &samples, SampleLabels::CONTENTION, window())
            .unwrap();

        let render = |compression| {
            let mut out = Vec::new();
            PprofRenderer::new(compression)
                .render(&mut out, &samples, SampleLabels::CONTENTION, window())
                .unwrap();
            out
        };

        assert_eq!(render(Compression::None), expected);

        let mut gunzipped = Vec::new();
        flate2::read::GzDecoder::new(render(Compression::Gzip).as_slice())
            .read_to_end(&mut gunzipped)
            .unwrap();
        assert_eq!(gunzipped, expected);

        let mut unlz4 = Vec::new();
        lz4_flex::frame::FrameDecoder::new(render(Compression::Lz4).as_slice())
            .read_to_end(&mut unlz4)
            .unwrap();
        assert_eq!(unlz4, expected);
    }

    #[test]
    fn sink_errors_propagate() {
        struct Full;
        impl Write for Full {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::ErrorKind::StorageFull.into())
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = PprofRenderer::new(Compression::None)
            .render(&mut Full, &samples(), SampleLabels::CONTENTION, window())
            .unwrap_err();
        match err {
            DeltaProfileError::Io(err) => assert_eq!(err.kind(), io::ErrorKind::StorageFull),
            other => panic!("unexpected error: {other}"),
        }
    }
}
