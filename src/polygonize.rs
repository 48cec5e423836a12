//! Mask boundary tracing into pixel-coordinate polygons.
//!
//! Contours are traced at the 0.5 iso-level of the 0/1 raster with marching
//! squares. The mask is padded with background so every contour closes;
//! vertices that land in the padding are clamped back onto the edge pixel
//! centres.

use crate::error::Result;
use log::{debug, info};
use ndarray::Array2;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Doubled padded-grid coordinates, so edge midpoints stay integral
type Node = (i64, i64);

/// Closed ring with its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct MaskPolygon {
    /// `(x, y)` = (column, row) vertices, not repeating the first vertex
    pub ring: Vec<(f64, f64)>,
    /// Shoelace area in pixels
    pub area: f64,
}

impl MaskPolygon {
    pub fn vertex_count(&self) -> usize {
        self.ring.len()
    }
}

/// Geometry collection produced from a mask, always with its attribute table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonSet {
    pub polygons: Vec<MaskPolygon>,
}

impl PolygonSet {
    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    /// Attribute rows as (area, vertices), one per polygon
    pub fn attributes(&self) -> Vec<(f64, usize)> {
        self.polygons
            .iter()
            .map(|p| (p.area, p.vertex_count()))
            .collect()
    }

    /// GeoJSON FeatureCollection in pixel coordinates
    pub fn to_geojson(&self) -> Value {
        let features: Vec<Value> = self
            .polygons
            .iter()
            .enumerate()
            .map(|(id, polygon)| {
                let mut coords: Vec<[f64; 2]> =
                    polygon.ring.iter().map(|&(x, y)| [x, y]).collect();
                if let Some(&first) = coords.first() {
                    coords.push(first);
                }
                json!({
                    "type": "Feature",
                    "id": id,
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [coords],
                    },
                    "properties": {
                        "area": polygon.area,
                        "vertices": polygon.vertex_count(),
                    },
                })
            })
            .collect();

        json!({
            "type": "FeatureCollection",
            "features": features,
        })
    }
}

/// Trace mask contours and keep rings of at least 3 vertices and `min_area` pixels
pub fn polygonize_mask(mask: &Array2<bool>, min_area: f64) -> PolygonSet {
    let (nrows, ncols) = mask.dim();
    if nrows == 0 || ncols == 0 {
        return PolygonSet::default();
    }

    let segments = march(mask);
    let rings = link_segments(&segments);
    debug!("Traced {} contours from {} segments", rings.len(), segments.len());

    let max_row = (nrows - 1) as f64;
    let max_col = (ncols - 1) as f64;

    let mut polygons = Vec::new();
    for ring in rings {
        let mut points: Vec<(f64, f64)> = Vec::with_capacity(ring.len());
        for (pr, pc) in ring {
            let row = (pr as f64 / 2.0 - 1.0).clamp(0.0, max_row);
            let col = (pc as f64 / 2.0 - 1.0).clamp(0.0, max_col);
            let point = (col, row);
            if points.last() != Some(&point) {
                points.push(point);
            }
        }
        while points.len() > 1 && points.first() == points.last() {
            points.pop();
        }

        if points.len() < 3 {
            continue;
        }

        let area = shoelace_area(&points);
        if area >= min_area {
            polygons.push(MaskPolygon { ring: points, area });
        }
    }

    info!(
        "Polygonized mask: {} polygons with area >= {}",
        polygons.len(),
        min_area
    );
    PolygonSet { polygons }
}

/// Write the polygon set as pretty-printed GeoJSON
pub fn write_geojson<P: AsRef<Path>>(set: &PolygonSet, path: P) -> Result<()> {
    let path = path.as_ref();
    let text = serde_json::to_string_pretty(&set.to_geojson())?;
    fs::write(path, text)?;
    info!("Wrote {} polygons to {}", set.len(), path.display());
    Ok(())
}

fn shoelace_area(points: &[(f64, f64)]) -> f64 {
    let n = points.len();
    let mut twice = 0.0;
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        twice += x0 * y1 - x1 * y0;
    }
    (twice / 2.0).abs()
}

/// Marching squares over the background-padded mask.
///
/// Saddle cells keep the set corners 4-connected, i.e. diagonal set pixels
/// get separate contours.
fn march(mask: &Array2<bool>) -> Vec<(Node, Node)> {
    let (nrows, ncols) = mask.dim();
    let at = |r: usize, c: usize| -> bool {
        // padded (r, c) maps to mask (r - 1, c - 1)
        r >= 1 && c >= 1 && r <= nrows && c <= ncols && mask[[r - 1, c - 1]]
    };

    let mut segments = Vec::new();
    for r in 0..=nrows {
        for c in 0..=ncols {
            let case = (at(r, c) as u8)
                | (at(r, c + 1) as u8) << 1
                | (at(r + 1, c + 1) as u8) << 2
                | (at(r + 1, c) as u8) << 3;

            let (ri, ci) = (r as i64, c as i64);
            let top = (2 * ri, 2 * ci + 1);
            let right = (2 * ri + 1, 2 * ci + 2);
            let bottom = (2 * ri + 2, 2 * ci + 1);
            let left = (2 * ri + 1, 2 * ci);

            match case {
                0 | 15 => {}
                1 | 14 => segments.push((left, top)),
                2 | 13 => segments.push((top, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((right, bottom)),
                6 | 9 => segments.push((top, bottom)),
                7 | 8 => segments.push((left, bottom)),
                5 => {
                    segments.push((left, top));
                    segments.push((right, bottom));
                }
                10 => {
                    segments.push((top, right));
                    segments.push((left, bottom));
                }
                _ => unreachable!("marching squares case out of range"),
            }
        }
    }
    segments
}

/// Chain segments sharing endpoints into closed rings
fn link_segments(segments: &[(Node, Node)]) -> Vec<Vec<Node>> {
    let mut adjacency: HashMap<Node, Vec<Node>> = HashMap::new();
    for &(a, b) in segments {
        adjacency.entry(a).or_default().push(b);
        adjacency.entry(b).or_default().push(a);
    }

    let mut visited: HashSet<Node> = HashSet::new();
    let mut rings = Vec::new();

    for &(start, _) in segments {
        if visited.contains(&start) {
            continue;
        }

        let mut ring = vec![start];
        visited.insert(start);
        let mut prev = start;
        let mut current = match adjacency.get(&start).and_then(|n| n.first()) {
            Some(&next) => next,
            None => continue,
        };

        while current != start && visited.insert(current) {
            ring.push(current);
            let next = adjacency
                .get(&current)
                .and_then(|n| n.iter().copied().find(|&p| p != prev));
            prev = current;
            match next {
                Some(p) => current = p,
                None => break,
            }
        }

        rings.push(ring);
    }

    rings
}
