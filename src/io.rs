//! Safetensors I/O for recordings and analysis results.
//!
//! Reader: a recording file holds
//!   `lfp`    [S, T, N]  F32 | F64
//!   `tones`  [S, T]     F32 | F64 | I32 | I64
//!
//! Writer: [`StWriter`] collects named F64 / I32 tensors and writes one
//! safetensors file; [`write_lines`] writes the plain-text summaries.
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array2, Array3};
use std::collections::HashMap;
use std::path::Path;

use crate::trials::Recording;

// ── Low-level safetensors parser (raw bytes → Vec<f64>; no dependency on the
//    `safetensors` crate's tensor types). ──────────────────────────────────────

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let n = u64::from_le_bytes(bytes[..8].try_into()?) as usize;
    if bytes.len() < 8 + n {
        bail!("safetensors header length {n} exceeds file size {}", bytes.len());
    }
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..8 + n]).context("failed to parse safetensors header")?;
    Ok((header, 8 + n))
}

fn shape_of(entry: &serde_json::Value) -> Result<Vec<usize>> {
    entry["shape"]
        .as_array()
        .context("tensor entry has no 'shape'")?
        .iter()
        .map(|v| v.as_u64().map(|d| d as usize).context("non-integer shape entry"))
        .collect()
}

/// Decode one tensor to `f64`, whatever its stored numeric dtype.
fn read_tensor_f64(bytes: &[u8], data_start: usize, entry: &serde_json::Value) -> Result<Vec<f64>> {
    let offsets = entry["data_offsets"].as_array().context("tensor entry has no 'data_offsets'")?;
    let (s, e) = match offsets.as_slice() {
        [s, e] => (
            s.as_u64().context("bad start offset")? as usize,
            e.as_u64().context("bad end offset")? as usize,
        ),
        _ => bail!("data_offsets must have two entries"),
    };
    let raw = bytes
        .get(data_start + s..data_start + e)
        .context("tensor data lies outside the file")?;

    let dtype = entry["dtype"].as_str().context("tensor entry has no 'dtype'")?;
    let vals = match dtype {
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        "I32" => raw
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "I64" => raw
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]) as f64)
            .collect(),
        other => bail!("unsupported dtype {other}"),
    };
    Ok(vals)
}

// ── Recording loader ──────────────────────────────────────────────────────────

impl Recording {
    /// Load `lfp` [S, T, N] and `tones` [S, T] from a safetensors file.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading recording {}", path.display()))?;
        let (header, data_start) = parse_header(&bytes)?;

        let lfp_entry = header.get("lfp").context("missing 'lfp' key")?;
        let lfp_shape = shape_of(lfp_entry)?;
        let [n_s, n_t, n_x] = lfp_shape[..] else {
            bail!("'lfp' must be 3-D [sessions, trials, samples], got shape {lfp_shape:?}");
        };
        let lfp = Array3::from_shape_vec((n_s, n_t, n_x), read_tensor_f64(&bytes, data_start, lfp_entry)?)
            .context("'lfp' data does not match its shape")?;

        let tone_entry = header.get("tones").context("missing 'tones' key")?;
        let tone_shape = shape_of(tone_entry)?;
        let [t_s, t_t] = tone_shape[..] else {
            bail!("'tones' must be 2-D [sessions, trials], got shape {tone_shape:?}");
        };
        let tones = Array2::from_shape_vec((t_s, t_t), read_tensor_f64(&bytes, data_start, tone_entry)?)
            .context("'tones' data does not match its shape")?;

        log::info!("loaded {} → {n_s} sessions × {n_t} trials × {n_x} samples", path.display());
        Ok(Recording::new(lfp, tones)?)
    }

    /// Write this recording in the format [`Recording::load`] reads.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = StWriter::new();
        w.add_f64_arr3("lfp", &self.lfp);
        w.add_f64_arr2("tones", &self.tones);
        w.write(path)
    }
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors writer for F64 and I32 tensors.
///
/// ```rust,no_run
/// use lfp_tone::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("erp", &[1.0, 2.0, 3.0], &[3]);
/// w.add_i32("n_trials", &[12], &[1]);
/// w.write(Path::new("/tmp/out.safetensors")).unwrap();
/// ```
#[derive(Default)]
pub struct StWriter {
    entries: Vec<(String, Vec<u8>, &'static str, Vec<usize>)>,
}

impl StWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr1(&mut self, name: &str, arr: &Array1<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.len()]);
    }

    pub fn add_f64_arr2(&mut self, name: &str, arr: &Array2<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, &[arr.nrows(), arr.ncols()]);
    }

    pub fn add_f64_arr3(&mut self, name: &str, arr: &Array3<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        let (a, b, c) = arr.dim();
        self.add_f64(name, &data, &[a, b, c]);
    }

    pub fn add_i32(&mut self, name: &str, data: &[i32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "I32", shape.to_vec()));
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, offset + data.len()],
            }));
            offset += data.len();
        }
        let hdr_bytes = serde_json::to_vec(&header_map)?;
        let pad = (8 - hdr_bytes.len() % 8) % 8;
        let padded: Vec<u8> = hdr_bytes.into_iter()
            .chain(std::iter::repeat(b' ').take(pad))
            .collect();
        let mut f = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        f.write_all(&(padded.len() as u64).to_le_bytes())?;
        f.write_all(&padded)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        Ok(())
    }
}

/// Read every numeric tensor of a safetensors file as `(shape, f64 data)`.
pub fn read_all_f64(path: &Path) -> Result<HashMap<String, (Vec<usize>, Vec<f64>)>> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;
    header
        .iter()
        .filter(|(k, _)| k.as_str() != "__metadata__")
        .map(|(k, entry)| {
            let shape = shape_of(entry)?;
            let data = read_tensor_f64(&bytes, data_start, entry)
                .with_context(|| format!("decoding tensor '{k}'"))?;
            Ok((k.clone(), (shape, data)))
        })
        .collect()
}

/// Write `lines` to `path`, one per line.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}
