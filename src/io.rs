//! Safetensors I/O for study data cubes.
//!
//! A study file holds one top-level field (e.g. `Data_All`) whose members are
//! stored as `<field>.<member>` tensors:
//!
//! ```text
//! Data_All.s2        F32|F64  [subjects, samples, trials, blocks]
//! Data_All.time      F32|F64  [samples]
//! Data_All.subjects  U8       newline-separated identifiers
//! Data_All.group     U8       newline-separated labels (optional)
//! ```
//!
//! An empty field name means bare member keys (`s2`, `time`, ...).
use anyhow::{bail, Context, Result};
use ndarray::{Array1, Array4};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::cube::DataCube;

// ── Low-level safetensors parser ──────────────────────────────────────────────

struct Entry {
    dtype: String,
    shape: Vec<usize>,
    start: usize,
    end: usize,
}

fn parse_header(bytes: &[u8]) -> Result<(HashMap<String, serde_json::Value>, usize)> {
    if bytes.len() < 8 {
        bail!("safetensors file too small");
    }
    let n = usize::try_from(u64::from_le_bytes(bytes[..8].try_into()?))
        .context("safetensors header length does not fit in memory")?;
    let data_start = 8usize
        .checked_add(n)
        .filter(|&end| end <= bytes.len())
        .with_context(|| format!("safetensors header truncated ({n} bytes declared)"))?;
    let header: HashMap<String, serde_json::Value> =
        serde_json::from_slice(&bytes[8..data_start])
            .context("failed to parse safetensors header")?;
    Ok((header, data_start))
}

fn entry(header: &HashMap<String, serde_json::Value>, key: &str) -> Result<Option<Entry>> {
    let Some(v) = header.get(key) else {
        return Ok(None);
    };
    let dtype = v["dtype"].as_str().with_context(|| format!("'{key}': missing dtype"))?;
    let shape = v["shape"]
        .as_array()
        .with_context(|| format!("'{key}': missing shape"))?
        .iter()
        .map(|d| d.as_u64().map(|d| d as usize))
        .collect::<Option<Vec<_>>>()
        .with_context(|| format!("'{key}': malformed shape"))?;
    let offsets = v["data_offsets"]
        .as_array()
        .with_context(|| format!("'{key}': missing data_offsets"))?;
    let (Some(start), Some(end)) = (
        offsets.first().and_then(|o| o.as_u64()),
        offsets.get(1).and_then(|o| o.as_u64()),
    ) else {
        bail!("'{key}': malformed data_offsets");
    };
    let (Ok(start), Ok(end)) = (usize::try_from(start), usize::try_from(end)) else {
        bail!("'{key}': data_offsets out of range");
    };
    if start > end {
        bail!("'{key}': data_offsets start {start} is after end {end}");
    }
    Ok(Some(Entry { dtype: dtype.to_string(), shape, start, end }))
}

fn tensor_bytes<'a>(bytes: &'a [u8], data_start: usize, e: &Entry, key: &str) -> Result<&'a [u8]> {
    let past_end = || format!("'{key}': data offsets past end of file");
    let start = data_start.checked_add(e.start).with_context(past_end)?;
    let end = data_start.checked_add(e.end).with_context(past_end)?;
    bytes.get(start..end).with_context(past_end)
}

fn read_float_tensor(bytes: &[u8], data_start: usize, e: &Entry, key: &str) -> Result<Vec<f64>> {
    let raw = tensor_bytes(bytes, data_start, e, key)?;
    let vals: Vec<f64> = match e.dtype.as_str() {
        "F32" => raw
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]) as f64)
            .collect(),
        "F64" => raw
            .chunks_exact(8)
            .map(|b| f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        other => bail!("'{key}': expected F32 or F64, found {other}"),
    };
    let expected = e
        .shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .with_context(|| format!("'{key}': shape {:?} overflows", e.shape))?;
    if vals.len() != expected {
        bail!("'{key}': {} values for shape {:?}", vals.len(), e.shape);
    }
    Ok(vals)
}

fn read_string_list(bytes: &[u8], data_start: usize, e: &Entry, key: &str) -> Result<Vec<String>> {
    if e.dtype != "U8" {
        bail!("'{key}': expected U8 text, found {}", e.dtype);
    }
    let text = std::str::from_utf8(tensor_bytes(bytes, data_start, e, key)?)
        .with_context(|| format!("'{key}': not UTF-8"))?;
    Ok(text
        .split('\n')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect())
}

/// `"<field>.<member>"`, or just `member` for an empty field name.
pub fn member_key(field: &str, member: &str) -> String {
    if field.is_empty() {
        member.to_string()
    } else {
        format!("{field}.{member}")
    }
}

// ── Cube loader ───────────────────────────────────────────────────────────────

/// Load the cube stored under `field` in the safetensors file at `path`.
///
/// `group_member` names the optional per-subject label member.
pub fn load_cube(path: &Path, field: &str, group_member: &str) -> Result<DataCube> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let (header, data_start) = parse_header(&bytes)?;

    let key = member_key(field, "s2");
    let e = entry(&header, &key)?.with_context(|| format!("missing '{key}' key"))?;
    if e.shape.len() != 4 {
        bail!("'{key}': expected 4 dimensions, found shape {:?}", e.shape);
    }
    let dims = (e.shape[0], e.shape[1], e.shape[2], e.shape[3]);
    let s2 = Array4::from_shape_vec(dims, read_float_tensor(&bytes, data_start, &e, &key)?)?;

    let key = member_key(field, "time");
    let e = entry(&header, &key)?.with_context(|| format!("missing '{key}' key"))?;
    let timeline = Array1::from(read_float_tensor(&bytes, data_start, &e, &key)?);

    let key = member_key(field, "subjects");
    let e = entry(&header, &key)?.with_context(|| format!("missing '{key}' key"))?;
    let subjects = read_string_list(&bytes, data_start, &e, &key)?;

    let mut cube = DataCube::new(s2, timeline, subjects)
        .with_context(|| format!("inconsistent cube in {}", path.display()))?;

    // Group labels are optional.
    let key = member_key(field, group_member);
    if let Some(e) = entry(&header, &key)? {
        let labels = read_string_list(&bytes, data_start, &e, &key)?;
        cube = cube.with_groups(labels).with_context(|| format!("'{key}'"))?;
    }

    let (n_sub, n_t, n_tr, n_b) = cube.dims();
    info!(
        path = %path.display(),
        subjects = n_sub,
        samples = n_t,
        trials = n_tr,
        blocks = n_b,
        "loaded data cube"
    );
    Ok(cube)
}

// ── Generic safetensors builder ───────────────────────────────────────────────

/// Simple safetensors file writer for F32, F64 and U8 tensors.
///
/// ```rust,no_run
/// use eegtools::io::StWriter;
/// use std::path::Path;
/// let mut w = StWriter::new();
/// w.add_f64("Data_All.time", &[0.0, 4.0, 8.0], &[3]);
/// w.add_strings("Data_All.subjects", &["S01".to_string()]).unwrap();
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

    pub fn add_f32(&mut self, name: &str, data: &[f32], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F32", shape.to_vec()));
    }

    pub fn add_f64(&mut self, name: &str, data: &[f64], shape: &[usize]) {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.entries.push((name.to_string(), bytes, "F64", shape.to_vec()));
    }

    pub fn add_f64_arr4(&mut self, name: &str, arr: &Array4<f64>) {
        let data: Vec<f64> = arr.iter().copied().collect();
        self.add_f64(name, &data, arr.shape());
    }

    /// Newline-joined UTF-8 text stored as a U8 tensor.
    ///
    /// Items must be non-empty and free of `\n`, otherwise the list would not
    /// read back with the same length.
    pub fn add_strings(&mut self, name: &str, items: &[String]) -> Result<()> {
        if let Some(i) = items.iter().position(|s| s.is_empty() || s.contains('\n')) {
            bail!("'{name}': item {i} ({:?}) is empty or contains a newline", items[i]);
        }
        let bytes = items.join("\n").into_bytes();
        let len = bytes.len();
        self.entries.push((name.to_string(), bytes, "U8", vec![len]));
        Ok(())
    }

    /// Header JSON (space-padded to 8 bytes) describing every entry in order.
    fn header(&self) -> Result<Vec<u8>> {
        let mut header_map = serde_json::Map::new();
        let mut offset: usize = 0;
        for (name, data, dtype, shape) in &self.entries {
            let end = offset + data.len();
            let previous = header_map.insert(name.clone(), serde_json::json!({
                "dtype": dtype,
                "shape": shape,
                "data_offsets": [offset, end],
            }));
            if previous.is_some() {
                bail!("duplicate tensor name '{name}'");
            }
            offset = end;
        }
        let mut hdr = serde_json::to_vec(&header_map)?;
        hdr.resize(hdr.len().next_multiple_of(8), b' ');
        Ok(hdr)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        use std::io::Write;
        let hdr = self.header()?;
        let mut f = std::io::BufWriter::new(
            std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?,
        );
        f.write_all(&(hdr.len() as u64).to_le_bytes())?;
        f.write_all(&hdr)?;
        for (_, data, _, _) in &self.entries {
            f.write_all(data)?;
        }
        f.flush()?;
        Ok(())
    }
}

/// Write `cube` under `field` in the layout [`load_cube`] reads.
///
/// Subject identifiers must be unique, and `group_member` must not collide
/// with the cube's own members.
pub fn write_cube(cube: &DataCube, field: &str, group_member: &str, path: &Path) -> Result<()> {
    if let Some((i, dup)) = cube
        .subjects()
        .iter()
        .enumerate()
        .find(|(i, s)| cube.subjects()[..*i].contains(*s))
    {
        bail!("duplicate subject id '{dup}' at row {i}");
    }
    if cube.groups().is_some() && ["s2", "time", "subjects"].contains(&group_member) {
        bail!("group member name '{group_member}' collides with a cube member");
    }

    let mut w = StWriter::new();
    w.add_f64_arr4(&member_key(field, "s2"), cube.s2());
    let time: Vec<f64> = cube.timeline().to_vec();
    w.add_f64(&member_key(field, "time"), &time, &[time.len()]);
    w.add_strings(&member_key(field, "subjects"), cube.subjects())?;
    if let Some(groups) = cube.groups() {
        w.add_strings(&member_key(field, group_member), groups)?;
    }
    w.write(path)
        .with_context(|| format!("writing cube '{field}' to {}", path.display()))
}
