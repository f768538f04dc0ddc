// crates/gt_ops/src/grid/ntv2.rs

//! NTv2 水平偏移格网
//!
//! 文件布局（每条记录 16 字节：8 字节关键字 + 8 字节取值）：
//!
//! ```text
//! 总头部   11 条记录  NUM_OREC NUM_SREC NUM_FILE GS_TYPE VERSION SYSTEM_F SYSTEM_T
//!                     MAJOR_F MINOR_F MAJOR_T MINOR_T
//! 子格网头 11 条记录  SUB_NAME PARENT CREATED UPDATED S_LAT N_LAT E_LONG W_LONG
//!                     LAT_INC LONG_INC GS_COUNT
//! 节点     GS_COUNT 条 f32 × 4：纬度偏移、经度偏移、纬度精度、经度精度
//! ```
//!
//! 经度以西为正，节点按行自南向北、行内自东向西排列。
//! 解码后统一为东正经度、弧度，行内自西向东。

use super::{bilinear, locate_cell, GridHandle};
use gt_foundation::{GtError, GtResult, Tolerance, TransformErrorKind};
use std::f64::consts::PI;

/// 文件起始关键字
pub const MAGIC: &[u8; 8] = b"NUM_OREC";

const RECORD: usize = 16;
const HEADER_RECORDS: usize = 11;
const HEADER_BYTES: usize = RECORD * HEADER_RECORDS;
const ARCSEC_TO_RAD: f64 = PI / 648_000.0;

/// 单个子格网
#[derive(Debug, Clone)]
pub struct Subgrid {
    /// 名称
    pub name: String,
    /// 父格网名称（顶层为 `NONE`）
    pub parent: String,
    /// 西边界经度 [rad]
    pub west: f64,
    /// 南边界纬度 [rad]
    pub south: f64,
    /// 经度间隔 [rad]
    pub dlon: f64,
    /// 纬度间隔 [rad]
    pub dlat: f64,
    /// 列数
    pub cols: usize,
    /// 行数
    pub rows: usize,
    /// 节点偏移 (Δλ, Δφ) [rad]，行主序，自南向北、自西向东
    shifts: Vec<[f64; 2]>,
}

impl Subgrid {
    /// 东边界经度 [rad]
    pub fn east(&self) -> f64 {
        self.west + self.dlon * (self.cols - 1) as f64
    }

    /// 北边界纬度 [rad]
    pub fn north(&self) -> f64 {
        self.south + self.dlat * (self.rows - 1) as f64
    }

    fn cell_size(&self) -> f64 {
        self.dlon * self.dlat
    }

    fn contains(&self, lon: f64, lat: f64) -> bool {
        const EDGE: f64 = 1e-12;
        lon >= self.west - EDGE
            && lon <= self.east() + EDGE
            && lat >= self.south - EDGE
            && lat <= self.north() + EDGE
    }

    /// 双线性插值 (Δλ, Δφ)
    fn interpolate(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        let x = (lon - self.west) / self.dlon;
        let y = (lat - self.south) / self.dlat;
        let (col, row, fx, fy) =
            locate_cell(x, y, self.cols, self.rows).ok_or(TransformErrorKind::OutsideGrid)?;
        let at = |c: usize, r: usize| self.shifts[r * self.cols + c];
        let corners = [at(col, row), at(col + 1, row), at(col, row + 1), at(col + 1, row + 1)];
        if corners.iter().flatten().any(|v| !v.is_finite()) {
            return Err(TransformErrorKind::GridAtNodata);
        }
        let component =
            |i: usize| bilinear(fx, fy, corners[0][i], corners[1][i], corners[2][i], corners[3][i]);
        Ok((component(0), component(1)))
    }
}

/// NTv2 格网
#[derive(Debug, Clone)]
pub struct HorizontalGrid {
    /// 格网名称
    pub name: String,
    /// 子格网
    pub subgrids: Vec<Subgrid>,
}

impl HorizontalGrid {
    /// 内存占用估计（字节）
    pub fn byte_size(&self) -> usize {
        self.subgrids
            .iter()
            .map(|g| g.shifts.len() * std::mem::size_of::<[f64; 2]>())
            .sum()
    }

    /// 包含该点的最细子格网，经度按 ±2π 回绕
    fn find(&self, lon: f64, lat: f64) -> Option<(&Subgrid, f64)> {
        [lon, lon - 2.0 * PI, lon + 2.0 * PI]
            .into_iter()
            .flat_map(|l| {
                self.subgrids
                    .iter()
                    .filter(move |g| g.contains(l, lat))
                    .map(move |g| (g, l))
            })
            .min_by(|a, b| a.0.cell_size().total_cmp(&b.0.cell_size()))
    }

    /// 该点的偏移 (Δλ, Δφ) [rad]
    ///
    /// # Errors
    /// 点不在任何子格网内返回 `OutsideGrid`，落在无数据节点返回 `GridAtNodata`
    pub fn shift(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        let (grid, l) = self.find(lon, lat).ok_or(TransformErrorKind::OutsideGrid)?;
        grid.interpolate(l, lat)
    }

    /// 正向改正：加上偏移
    ///
    /// # Errors
    /// 同 [`Self::shift`]
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        let (dlon, dlat) = self.shift(lon, lat)?;
        Ok((lon + dlon, lat + dlat))
    }

    /// 逆向改正：迭代求解 x + shift(x) = target
    ///
    /// # Errors
    /// 迭代过程中离开格网时返回相应错误
    pub fn inverse(&self, lon: f64, lat: f64) -> Result<(f64, f64), TransformErrorKind> {
        let tol = Tolerance::default();
        let (dlon, dlat) = self.shift(lon, lat)?;
        let mut guess = (lon - dlon, lat - dlat);
        for _ in 0..tol.max_iterations {
            let (dlon, dlat) = self.shift(guess.0, guess.1)?;
            let next = (lon - dlon, lat - dlat);
            let step = (next.0 - guess.0).abs().max((next.1 - guess.1).abs());
            guess = next;
            if tol.is_converged(step) {
                break;
            }
        }
        Ok(guess)
    }
}

// ============================================================================
// 解码
// ============================================================================

#[derive(Clone, Copy)]
enum Endian {
    Little,
    Big,
}

struct Header<'a> {
    bytes: &'a [u8],
    endian: Endian,
}

impl Header<'_> {
    fn keyword(&self, index: usize) -> String {
        let start = index * RECORD;
        String::from_utf8_lossy(&self.bytes[start..start + 8])
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    fn text(&self, index: usize) -> String {
        let start = index * RECORD + 8;
        String::from_utf8_lossy(&self.bytes[start..start + 8])
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    fn int(&self, index: usize) -> i32 {
        let start = index * RECORD + 8;
        let raw = [
            self.bytes[start],
            self.bytes[start + 1],
            self.bytes[start + 2],
            self.bytes[start + 3],
        ];
        match self.endian {
            Endian::Little => i32::from_le_bytes(raw),
            Endian::Big => i32::from_be_bytes(raw),
        }
    }

    fn float(&self, index: usize) -> f64 {
        let start = index * RECORD + 8;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.bytes[start..start + 8]);
        match self.endian {
            Endian::Little => f64::from_le_bytes(raw),
            Endian::Big => f64::from_be_bytes(raw),
        }
    }
}

fn corrupt(name: &str, detail: impl std::fmt::Display) -> GtError {
    GtError::invalid_input(format!("NTv2 格网 {name} 损坏: {detail}"))
}

/// 由句柄解码 NTv2 格网
///
/// # Errors
/// 头部无效、节点数不符或读取不足时返回错误
pub fn decode(name: &str, handle: &mut dyn GridHandle) -> GtResult<HorizontalGrid> {
    let mut overview = vec![0u8; HEADER_BYTES];
    handle.read_exact_at(0, &mut overview)?;
    if &overview[..8] != MAGIC {
        return Err(corrupt(name, "缺少 NUM_OREC"));
    }
    let endian = match (
        i32::from_le_bytes([overview[8], overview[9], overview[10], overview[11]]),
        i32::from_be_bytes([overview[8], overview[9], overview[10], overview[11]]),
    ) {
        (11, _) => Endian::Little,
        (_, 11) => Endian::Big,
        (le, _) => return Err(corrupt(name, format!("NUM_OREC={le}"))),
    };
    let header = Header {
        bytes: &overview,
        endian,
    };
    let count = usize::try_from(header.int(2)).map_err(|_| corrupt(name, "NUM_FILE 为负"))?;
    let unit = match header.text(3).to_uppercase().as_str() {
        "SECONDS" => ARCSEC_TO_RAD,
        "MINUTES" => ARCSEC_TO_RAD * 60.0,
        "DEGREES" => ARCSEC_TO_RAD * 3600.0,
        other => return Err(corrupt(name, format!("未知的 GS_TYPE '{other}'"))),
    };

    // 每个子格网至少占一个头部
    let max_count = handle.len().saturating_sub(HEADER_BYTES as u64) / HEADER_BYTES as u64;
    if count as u64 > max_count {
        return Err(corrupt(name, format!("NUM_FILE={count} 超出文件长度")));
    }

    let mut offset = HEADER_BYTES as u64;
    let mut subgrids = Vec::with_capacity(count);
    for _ in 0..count {
        let (grid, next) = decode_subgrid(name, handle, offset, endian, unit)?;
        subgrids.push(grid);
        offset = next;
    }
    if subgrids.is_empty() {
        return Err(corrupt(name, "没有子格网"));
    }
    Ok(HorizontalGrid {
        name: name.to_string(),
        subgrids,
    })
}

fn decode_subgrid(
    name: &str,
    handle: &mut dyn GridHandle,
    offset: u64,
    endian: Endian,
    unit: f64,
) -> GtResult<(Subgrid, u64)> {
    let mut raw = vec![0u8; HEADER_BYTES];
    handle.read_exact_at(offset, &mut raw)?;
    let header = Header {
        bytes: &raw,
        endian,
    };
    if header.keyword(0) != "SUB_NAME" {
        return Err(corrupt(name, format!("偏移 {offset} 处缺少 SUB_NAME")));
    }
    let (s_lat, n_lat) = (header.float(4), header.float(5));
    let (e_long, w_long) = (header.float(6), header.float(7));
    let (lat_inc, long_inc) = (header.float(8), header.float(9));
    let gs_count = usize::try_from(header.int(10)).map_err(|_| corrupt(name, "GS_COUNT 为负"))?;
    if !(lat_inc > 0.0 && long_inc > 0.0) {
        return Err(corrupt(name, "格网间隔必须为正"));
    }
    let rows = node_count(n_lat - s_lat, lat_inc).ok_or_else(|| corrupt(name, "纬度范围无效"))?;
    let cols = node_count(w_long - e_long, long_inc).ok_or_else(|| corrupt(name, "经度范围无效"))?;
    if rows < 2 || cols < 2 || rows.checked_mul(cols) != Some(gs_count) {
        return Err(corrupt(
            name,
            format!("子格网 {} 为 {rows}×{cols}，GS_COUNT={gs_count}", header.text(0)),
        ));
    }

    let data_offset = offset + HEADER_BYTES as u64;
    let data_len = gs_count
        .checked_mul(RECORD)
        .filter(|len| data_offset.saturating_add(*len as u64) <= handle.len())
        .ok_or_else(|| corrupt(name, format!("GS_COUNT={gs_count} 超出文件长度")))?;
    let mut data = vec![0u8; data_len];
    handle.read_exact_at(data_offset, &mut data)?;
    let value = |i: usize| {
        let mut b = [0u8; 4];
        b.copy_from_slice(&data[i..i + 4]);
        f64::from(match endian {
            Endian::Little => f32::from_le_bytes(b),
            Endian::Big => f32::from_be_bytes(b),
        })
    };

    let mut shifts = vec![[0.0; 2]; gs_count];
    for row in 0..rows {
        for file_col in 0..cols {
            let record = (row * cols + file_col) * RECORD;
            let dlat = value(record) * unit;
            // 西正 → 东正
            let dlon = -value(record + 4) * unit;
            let col = cols - 1 - file_col;
            shifts[row * cols + col] = [dlon, dlat];
        }
    }

    let grid = Subgrid {
        name: header.text(0),
        parent: header.text(1),
        west: -w_long * unit,
        south: s_lat * unit,
        dlon: long_inc * unit,
        dlat: lat_inc * unit,
        cols,
        rows,
        shifts,
    };
    Ok((grid, data_offset + data.len() as u64))
}

/// 跨度与间隔对应的节点数，非有限或超出 `i32` 范围时为 `None`
fn node_count(span: f64, step: f64) -> Option<usize> {
    let intervals = (span / step).round();
    if !intervals.is_finite() || intervals < 0.0 || intervals >= f64::from(i32::MAX) {
        return None;
    }
    (intervals as usize).checked_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GridProvider, MemoryGridProvider};

    fn record_text(out: &mut Vec<u8>, key: &str, value: &str) {
        let mut k = [b' '; 8];
        k[..key.len()].copy_from_slice(key.as_bytes());
        let mut v = [b' '; 8];
        v[..value.len()].copy_from_slice(value.as_bytes());
        out.extend_from_slice(&k);
        out.extend_from_slice(&v);
    }

    fn record_int(out: &mut Vec<u8>, key: &str, value: i32, big: bool) {
        let mut k = [b' '; 8];
        k[..key.len()].copy_from_slice(key.as_bytes());
        out.extend_from_slice(&k);
        out.extend_from_slice(&if big { value.to_be_bytes() } else { value.to_le_bytes() });
        out.extend_from_slice(&[0u8; 4]);
    }

    fn record_float(out: &mut Vec<u8>, key: &str, value: f64, big: bool) {
        let mut k = [b' '; 8];
        k[..key.len()].copy_from_slice(key.as_bytes());
        out.extend_from_slice(&k);
        out.extend_from_slice(&if big { value.to_be_bytes() } else { value.to_le_bytes() });
    }

    /// 3×3 格网，覆盖经度 [-2°, 0°]、纬度 [50°, 52°]，偏移恒为 (+1", +2")（东正）
    fn sample(big: bool) -> Vec<u8> {
        let mut out = Vec::new();
        record_int(&mut out, "NUM_OREC", 11, big);
        record_int(&mut out, "NUM_SREC", 11, big);
        record_int(&mut out, "NUM_FILE", 1, big);
        record_text(&mut out, "GS_TYPE", "SECONDS");
        record_text(&mut out, "VERSION", "NTv2.0");
        record_text(&mut out, "SYSTEM_F", "A");
        record_text(&mut out, "SYSTEM_T", "B");
        for key in ["MAJOR_F", "MINOR_F", "MAJOR_T", "MINOR_T"] {
            record_float(&mut out, key, 6_378_137.0, big);
        }
        record_text(&mut out, "SUB_NAME", "TEST");
        record_text(&mut out, "PARENT", "NONE");
        record_text(&mut out, "CREATED", "");
        record_text(&mut out, "UPDATED", "");
        record_float(&mut out, "S_LAT", 50.0 * 3600.0, big);
        record_float(&mut out, "N_LAT", 52.0 * 3600.0, big);
        record_float(&mut out, "E_LONG", 0.0, big);
        record_float(&mut out, "W_LONG", 2.0 * 3600.0, big);
        record_float(&mut out, "LAT_INC", 3600.0, big);
        record_float(&mut out, "LONG_INC", 3600.0, big);
        record_int(&mut out, "GS_COUNT", 9, big);
        for _ in 0..9 {
            for v in [1.0f32, -2.0, 0.0, 0.0] {
                out.extend_from_slice(&if big { v.to_be_bytes() } else { v.to_le_bytes() });
            }
        }
        out
    }

    fn load(bytes: Vec<u8>) -> GtResult<HorizontalGrid> {
        let provider = MemoryGridProvider::new();
        provider.insert("t.gsb", bytes);
        let mut handle = provider.open_for_read("t.gsb")?;
        decode("t.gsb", handle.as_mut())
    }

    #[test]
    fn test_decode_both_endians() {
        for big in [false, true] {
            let grid = load(sample(big)).unwrap();
            assert_eq!(grid.subgrids.len(), 1);
            let g = &grid.subgrids[0];
            assert_eq!((g.rows, g.cols), (3, 3));
            assert!((g.west.to_degrees() + 2.0).abs() < 1e-12);
            assert!((g.north().to_degrees() - 52.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_shift_and_inverse() {
        let grid = load(sample(false)).unwrap();
        let (lon, lat) = ((-1.0f64).to_radians(), 51.0f64.to_radians());
        let (x, y) = grid.forward(lon, lat).unwrap();
        assert!(((x - lon) / ARCSEC_TO_RAD - 2.0).abs() < 1e-9);
        assert!(((y - lat) / ARCSEC_TO_RAD - 1.0).abs() < 1e-9);
        let (lon2, lat2) = grid.inverse(x, y).unwrap();
        assert!((lon2 - lon).abs() < 1e-12);
        assert!((lat2 - lat).abs() < 1e-12);
    }

    #[test]
    fn test_outside_grid() {
        let grid = load(sample(false)).unwrap();
        assert_eq!(
            grid.shift(5f64.to_radians(), 51f64.to_radians()),
            Err(TransformErrorKind::OutsideGrid)
        );
    }

    #[test]
    fn test_corrupt_headers() {
        let mut bytes = sample(false);
        bytes[8] = 12;
        assert!(load(bytes).is_err());

        let mut truncated = sample(false);
        truncated.truncate(HEADER_BYTES * 2 + 10);
        assert!(load(truncated).is_err());
    }

    fn patch_float(bytes: &mut [u8], record: usize, value: f64) {
        let start = record * RECORD + 8;
        bytes[start..start + 8].copy_from_slice(&value.to_le_bytes());
    }

    fn patch_int(bytes: &mut [u8], record: usize, value: i32) {
        let start = record * RECORD + 8;
        bytes[start..start + 4].copy_from_slice(&value.to_le_bytes());
    }

    #[test]
    fn test_hostile_header_values_rejected() {
        // 子格网头中 N_LAT 位于第 11 + 5 条记录
        for n_lat in [1e300, f64::INFINITY, f64::NAN, -1e300] {
            let mut bytes = sample(false);
            patch_float(&mut bytes, HEADER_RECORDS + 5, n_lat);
            assert!(load(bytes).is_err(), "N_LAT={n_lat}");
        }

        let mut tiny_step = sample(false);
        patch_float(&mut tiny_step, HEADER_RECORDS + 9, 1e-300);
        assert!(load(tiny_step).is_err());

        let mut many_nodes = sample(false);
        patch_int(&mut many_nodes, HEADER_RECORDS + 10, i32::MAX);
        assert!(load(many_nodes).is_err());

        let mut many_files = sample(false);
        patch_int(&mut many_files, 2, i32::MAX);
        assert!(load(many_files).is_err());
    }

    #[test]
    fn test_large_consistent_dimensions_checked_against_length() {
        // 行列与 GS_COUNT 自洽但数据远超文件长度
        let mut bytes = sample(false);
        patch_float(&mut bytes, HEADER_RECORDS + 5, 50.0 * 3600.0 + 99_999.0 * 3600.0);
        patch_int(&mut bytes, HEADER_RECORDS + 10, 100_000 * 3);
        assert!(load(bytes).is_err());
    }
}
