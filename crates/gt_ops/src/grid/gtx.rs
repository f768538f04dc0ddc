// crates/gt_ops/src/grid/gtx.rs

//! GTX 垂直偏移格网
//!
//! 40 字节大端头部：南纬、西经、纬度间隔、经度间隔（均为度，f64），行数、列数（i32）；
//! 随后是自南向北、行内自西向东的 f32 节点值。-88.8888 表示无数据。

use super::{bilinear, locate_cell, GridHandle};
use gt_foundation::{GtError, GtResult, TransformErrorKind};
use std::f64::consts::PI;

const HEADER_BYTES: usize = 40;

/// 无数据标记
pub const NODATA: f32 = -88.8888;

/// GTX 格网
#[derive(Debug, Clone)]
pub struct VerticalGrid {
    /// 格网名称
    pub name: String,
    /// 南边界纬度 [rad]
    pub south: f64,
    /// 西边界经度 [rad]
    pub west: f64,
    /// 纬度间隔 [rad]
    pub dlat: f64,
    /// 经度间隔 [rad]
    pub dlon: f64,
    /// 行数
    pub rows: usize,
    /// 列数
    pub cols: usize,
    values: Vec<f32>,
}

impl VerticalGrid {
    /// 内存占用估计（字节）
    pub fn byte_size(&self) -> usize {
        self.values.len() * std::mem::size_of::<f32>()
    }

    fn is_nodata(v: f32) -> bool {
        !v.is_finite() || (v - NODATA).abs() < 1e-4
    }

    /// 该点的偏移值 [m]，经度按 ±2π 回绕
    ///
    /// # Errors
    /// 点在格网外返回 `OutsideGrid`，任一相邻节点无数据返回 `GridAtNodata`
    pub fn value(&self, lon: f64, lat: f64) -> Result<f64, TransformErrorKind> {
        let y = (lat - self.south) / self.dlat;
        let (col, row, fx, fy) = [lon, lon + 2.0 * PI, lon - 2.0 * PI]
            .into_iter()
            .find_map(|l| locate_cell((l - self.west) / self.dlon, y, self.cols, self.rows))
            .ok_or(TransformErrorKind::OutsideGrid)?;
        let at = |c: usize, r: usize| self.values[r * self.cols + c];
        let corners = [at(col, row), at(col + 1, row), at(col, row + 1), at(col + 1, row + 1)];
        if corners.iter().any(|&v| Self::is_nodata(v)) {
            return Err(TransformErrorKind::GridAtNodata);
        }
        let [v00, v10, v01, v11] = corners.map(f64::from);
        Ok(bilinear(fx, fy, v00, v10, v01, v11))
    }
}

fn corrupt(name: &str, detail: impl std::fmt::Display) -> GtError {
    GtError::invalid_input(format!("GTX 格网 {name} 损坏: {detail}"))
}

/// 由句柄解码 GTX 格网
///
/// # Errors
/// 头部无效或数据不足时返回错误
pub fn decode(name: &str, handle: &mut dyn GridHandle) -> GtResult<VerticalGrid> {
    let mut header = [0u8; HEADER_BYTES];
    handle.read_exact_at(0, &mut header)?;
    let float = |i: usize| {
        let mut b = [0u8; 8];
        b.copy_from_slice(&header[i..i + 8]);
        f64::from_be_bytes(b)
    };
    let int = |i: usize| i32::from_be_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]);
    let (south, west, dlat, dlon) = (float(0), float(8), float(16), float(24));
    let rows = usize::try_from(int(32)).map_err(|_| corrupt(name, "行数为负"))?;
    let cols = usize::try_from(int(36)).map_err(|_| corrupt(name, "列数为负"))?;
    if rows < 2 || cols < 2 || !(dlat > 0.0 && dlon > 0.0) {
        return Err(corrupt(name, format!("{rows}×{cols}，间隔 {dlat}/{dlon}")));
    }
    let expected = (HEADER_BYTES + rows * cols * 4) as u64;
    if handle.len() < expected {
        return Err(corrupt(name, format!("需要 {expected} 字节，实际 {}", handle.len())));
    }

    let mut data = vec![0u8; rows * cols * 4];
    handle.read_exact_at(HEADER_BYTES as u64, &mut data)?;
    let values = data
        .chunks_exact(4)
        .map(|c| f32::from_be_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok(VerticalGrid {
        name: name.to_string(),
        south: south.to_radians(),
        west: west.to_radians(),
        dlat: dlat.to_radians(),
        dlon: dlon.to_radians(),
        rows,
        cols,
        values,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, GridProvider, MemoryGridProvider};

    /// 2×3 格网：纬度 [10°, 11°]、经度 [20°, 22°]，节点值为 行×10 + 列
    fn sample(nodata_at: Option<usize>) -> Vec<u8> {
        let mut out = Vec::new();
        for v in [10.0f64, 20.0, 1.0, 1.0] {
            out.extend_from_slice(&v.to_be_bytes());
        }
        out.extend_from_slice(&2i32.to_be_bytes());
        out.extend_from_slice(&3i32.to_be_bytes());
        for i in 0..6 {
            let v = if nodata_at == Some(i) {
                NODATA
            } else {
                ((i / 3) * 10 + i % 3) as f32
            };
            out.extend_from_slice(&v.to_be_bytes());
        }
        out
    }

    fn load(bytes: Vec<u8>) -> GtResult<VerticalGrid> {
        let provider = MemoryGridProvider::new();
        provider.insert("g.gtx", bytes);
        let mut handle = provider.open_for_read("g.gtx")?;
        match Grid::decode("g.gtx", handle.as_mut())? {
            Grid::Vertical(g) => Ok(g),
            Grid::Horizontal(_) => Err(GtError::internal("格式识别错误")),
        }
    }

    #[test]
    fn test_bilinear_value() {
        let grid = load(sample(None)).unwrap();
        let v = grid.value(20.5f64.to_radians(), 10.5f64.to_radians()).unwrap();
        assert!((v - 5.5).abs() < 1e-9, "{v}");
        let corner = grid.value(22f64.to_radians(), 11f64.to_radians()).unwrap();
        assert!((corner - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_nodata_and_outside() {
        let grid = load(sample(Some(4))).unwrap();
        assert_eq!(
            grid.value(20.5f64.to_radians(), 10.5f64.to_radians()),
            Err(TransformErrorKind::GridAtNodata)
        );
        assert_eq!(
            grid.value(21.5f64.to_radians(), 10.5f64.to_radians()),
            Err(TransformErrorKind::GridAtNodata)
        );
        assert_eq!(
            grid.value(30f64.to_radians(), 10.5f64.to_radians()),
            Err(TransformErrorKind::OutsideGrid)
        );
    }

    #[test]
    fn test_truncated() {
        let mut bytes = sample(None);
        bytes.truncate(50);
        assert!(load(bytes).is_err());
    }
}
