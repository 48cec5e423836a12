use crate::error::{CloudMaskError, Result};
use log::{debug, info, warn};
use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn};
use netcdf::AttributeValue;
use std::path::{Path, PathBuf};

/// Name and dimension names of a NetCDF variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableInfo {
    pub name: String,
    pub dims: Vec<String>,
}

impl VariableInfo {
    /// 1-D variable named after its own dimension
    pub fn is_coordinate(&self) -> bool {
        self.dims.len() == 1 && self.dims[0] == self.name
    }
}

/// A 2-D band read from the converted dataset, CF-decoded
#[derive(Debug, Clone)]
pub struct RasterBand {
    pub name: String,
    /// Names of the two kept axes (row, column)
    pub dims: Vec<String>,
    pub units: Option<String>,
    pub data: Array2<f32>,
}

/// Row/column coordinate axes for the exported mask
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub y: Vec<f64>,
    pub x: Vec<f64>,
}

impl Coordinates {
    /// Index coordinates `0..H-1`, `0..W-1`
    pub fn indices(height: usize, width: usize) -> Self {
        Self {
            y: (0..height).map(|i| i as f64).collect(),
            x: (0..width).map(|i| i as f64).collect(),
        }
    }
}

/// Pick the requested variable, or the first non-coordinate variable with >= 2 dims
pub fn choose_variable(requested: &str, variables: &[VariableInfo]) -> Option<String> {
    if variables.iter().any(|v| v.name == requested) {
        return Some(requested.to_string());
    }

    variables
        .iter()
        .find(|v| !v.is_coordinate() && v.dims.len() >= 2)
        .map(|v| v.name.clone())
}

/// Take index 0 along every axis beyond the first two
pub fn reduce_to_2d(name: &str, data: ArrayD<f32>) -> Result<Array2<f32>> {
    let shape = data.shape().to_vec();
    if shape.len() < 2 || shape[2..].iter().any(|&len| len == 0) {
        return Err(CloudMaskError::InvalidDimensions(name.to_string(), shape));
    }

    let mut reduced = data;
    while reduced.ndim() > 2 {
        let last = reduced.ndim() - 1;
        reduced = reduced.index_axis_move(Axis(last), 0);
    }

    if shape.len() > 2 {
        debug!("Reduced {} from {:?} to {:?}", name, shape, reduced.shape());
    }

    Ok(reduced.into_dimensionality::<Ix2>()?)
}

/// Apply `_FillValue`/`missing_value` masking then `scale_factor`/`add_offset`
pub fn decode_cf(
    values: &mut [f32],
    fill_value: Option<f64>,
    scale_factor: Option<f64>,
    add_offset: Option<f64>,
) {
    let fill = fill_value.map(|v| v as f32);
    let scale = scale_factor.unwrap_or(1.0) as f32;
    let offset = add_offset.unwrap_or(0.0) as f32;
    let rescale = scale_factor.is_some() || add_offset.is_some();

    for value in values.iter_mut() {
        if fill.is_some_and(|fv| *value == fv) {
            *value = f32::NAN;
        } else if rescale {
            *value = *value * scale + offset;
        }
    }
}

/// Read-only handle on the NetCDF produced by the converter
pub struct ConvertedDataset {
    file: netcdf::File,
    path: PathBuf,
}

impl ConvertedDataset {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening converted dataset: {}", path.display());
        let file = netcdf::open(&path)?;
        Ok(Self { file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn variables(&self) -> Vec<VariableInfo> {
        self.file
            .variables()
            .map(|var| VariableInfo {
                name: var.name(),
                dims: var.dimensions().iter().map(|d| d.name()).collect(),
            })
            .collect()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.file.variable(name).is_some()
    }

    /// Resolve the band variable, falling back to the first usable data variable
    pub fn select_variable(&self, requested: &str) -> Result<String> {
        let variables = self.variables();
        let chosen = choose_variable(requested, &variables).ok_or_else(|| {
            CloudMaskError::NoSuitableVariable(self.path().display().to_string())
        })?;

        if chosen != requested {
            warn!("Variable {} not found; using variable {}", requested, chosen);
        }
        Ok(chosen)
    }

    /// Read a variable as f32, CF-decode it and reduce it to 2-D
    pub fn read_band(&self, name: &str) -> Result<RasterBand> {
        let var = self
            .file
            .variable(name)
            .ok_or_else(|| CloudMaskError::MissingVariable(name.to_string()))?;

        let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
        let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
        debug!("Reading {} with dims {:?} shape {:?}", name, dims, shape);

        let mut values: Vec<f32> = read_values_f64(&var)?
            .into_iter()
            .map(|v| v as f32)
            .collect();

        let fill_value =
            get_f64_attr(&var, "_FillValue").or_else(|| get_f64_attr(&var, "missing_value"));
        decode_cf(
            &mut values,
            fill_value,
            get_f64_attr(&var, "scale_factor"),
            get_f64_attr(&var, "add_offset"),
        );

        let data = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
        let data = reduce_to_2d(name, data)?;

        Ok(RasterBand {
            name: name.to_string(),
            dims: dims.into_iter().take(2).collect(),
            units: get_string_attr(&var, "units"),
            data,
        })
    }

    /// Coordinate axes for a band's shape, index coordinates where none fit
    pub fn coordinates(&self, band: &RasterBand) -> Coordinates {
        let (height, width) = band.data.dim();
        let row_dim = band.dims.first().map(String::as_str).unwrap_or("y");
        let col_dim = band.dims.get(1).map(String::as_str).unwrap_or("x");

        let fallback = Coordinates::indices(height, width);
        Coordinates {
            y: self
                .read_axis(&[row_dim, "y"], height)
                .unwrap_or(fallback.y),
            x: self
                .read_axis(&[col_dim, "x"], width)
                .unwrap_or(fallback.x),
        }
    }

    fn read_axis(&self, candidates: &[&str], len: usize) -> Option<Vec<f64>> {
        candidates.iter().find_map(|name| {
            let var = self.file.variable(name)?;
            if var.dimensions().len() != 1 || var.dimensions()[0].len() != len {
                return None;
            }
            read_values_f64(&var).ok()
        })
    }
}

/// Write a boolean mask as `u8` (0/1) over dims `(y, x)` with coordinate variables
pub fn write_mask_netcdf<P: AsRef<Path>>(
    mask: &Array2<bool>,
    path: P,
    template: Option<&Coordinates>,
    var_name: &str,
) -> Result<()> {
    let path = path.as_ref();
    let (height, width) = mask.dim();
    info!("Creating mask file: {}", path.display());

    let coords = match template {
        Some(c) if c.y.len() == height && c.x.len() == width => c.clone(),
        Some(_) => {
            warn!("Template coordinates do not match mask shape, using indices");
            Coordinates::indices(height, width)
        }
        None => Coordinates::indices(height, width),
    };

    let mut file = netcdf::create(path)?;
    file.add_dimension("y", height)?;
    file.add_dimension("x", width)?;

    {
        let mut y_var = file.add_variable::<f64>("y", &["y"])?;
        y_var.put_values(&coords.y, ..)?;
    }
    {
        let mut x_var = file.add_variable::<f64>("x", &["x"])?;
        x_var.put_values(&coords.x, ..)?;
    }

    let data: Vec<u8> = mask.iter().map(|&cloud| cloud as u8).collect();
    let mut mask_var = file.add_variable::<u8>(var_name, &["y", "x"])?;
    mask_var.put_attribute("long_name", "cloud mask (1 = cloud)")?;
    mask_var.put_values(&data, ..)?;

    info!(
        "Wrote {} ({}x{}) to {}",
        var_name,
        width,
        height,
        path.display()
    );
    Ok(())
}

/// Read a mask variable back as a `u8` grid
pub fn read_mask_netcdf<P: AsRef<Path>>(path: P, var_name: &str) -> Result<Array2<u8>> {
    let file = netcdf::open(path.as_ref())?;
    let var = file
        .variable(var_name)
        .ok_or_else(|| CloudMaskError::MissingVariable(var_name.to_string()))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    if shape.len() != 2 {
        return Err(CloudMaskError::InvalidDimensions(var_name.to_string(), shape));
    }

    let values: Vec<u8> = var.get_values(..)?;
    Ok(Array2::from_shape_vec((shape[0], shape[1]), values)?)
}

/// Read any numeric variable widened to f64.
///
/// f64 is tried first; if the library refuses a converting read, the native
/// integer and float types are tried in turn.
fn read_values_f64(var: &netcdf::Variable) -> Result<Vec<f64>> {
    macro_rules! try_native {
        ($($t:ty),*) => {
            $(
                if let Ok(values) = var.get_values::<$t, _>(..) {
                    return Ok(values.into_iter().map(|v| v as f64).collect());
                }
            )*
        };
    }

    let first_error = match var.get_values::<f64, _>(..) {
        Ok(values) => return Ok(values),
        Err(e) => e,
    };
    debug!("Direct f64 read of {} failed ({}), trying native types", var.name(), first_error);

    try_native!(f32, u16, i16, u8, i8, i32, u32, i64, u64);
    Err(first_error.into())
}

/// Check attribute presence first; libnetcdf logs a diagnostic for missing ones
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}

fn get_string_attr(var: &netcdf::Variable, name: &str) -> Option<String> {
    if !has_attr(var, name) {
        return None;
    }
    match var.attribute_value(name)?.ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn info(name: &str, dims: &[&str]) -> VariableInfo {
        VariableInfo {
            name: name.to_string(),
            dims: dims.iter().map(|d| d.to_string()).collect(),
        }
    }

    #[test]
    fn test_choose_requested_variable() {
        let vars = vec![info("Band1", &["y", "x"]), info("MULTI", &["y", "x"])];
        assert_eq!(choose_variable("MULTI", &vars), Some("MULTI".to_string()));
    }

    #[test]
    fn test_choose_falls_back_to_first_2d() {
        let vars = vec![
            info("crs", &[]),
            info("x", &["x"]),
            info("y", &["y"]),
            info("Band1", &["y", "x"]),
            info("Band2", &["y", "x"]),
        ];
        assert_eq!(choose_variable("MULTI", &vars), Some("Band1".to_string()));
    }

    #[test]
    fn test_choose_none_suitable() {
        let vars = vec![info("crs", &[]), info("x", &["x"]), info("time", &["time"])];
        assert_eq!(choose_variable("MULTI", &vars), None);
    }

    #[test]
    fn test_reduce_2d_is_identity() {
        let data = arr2(&[[1.0f32, 2.0], [3.0, 4.0]]);
        let reduced = reduce_to_2d("v", data.clone().into_dyn()).unwrap();
        assert_eq!(reduced, data);
    }

    #[test]
    fn test_reduce_takes_first_index_of_extra_axes() {
        // shape (2, 3, 4, 5)
        let data = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4, 5]), |idx| {
            (idx[0] * 1000 + idx[1] * 100 + idx[2] * 10 + idx[3]) as f32
        });
        let reduced = reduce_to_2d("v", data).unwrap();
        assert_eq!(reduced.dim(), (2, 3));
        assert_eq!(reduced[[1, 2]], 1200.0);
        assert_eq!(reduced[[0, 1]], 100.0);
    }

    #[test]
    fn test_reduce_rejects_1d() {
        let data = ArrayD::from_shape_vec(IxDyn(&[4]), vec![0.0f32; 4]).unwrap();
        assert!(matches!(
            reduce_to_2d("v", data),
            Err(CloudMaskError::InvalidDimensions(_, _))
        ));
    }

    #[test]
    fn test_decode_cf() {
        let mut values = vec![65535.0, 100.0, 0.0];
        decode_cf(&mut values, Some(65535.0), Some(0.01), Some(1.0));
        assert!(values[0].is_nan());
        assert!((values[1] - 2.0).abs() < 1e-6);
        assert!((values[2] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_decode_cf_without_attributes() {
        let mut values = vec![5000.0, 1.5];
        decode_cf(&mut values, None, None, None);
        assert_eq!(values, vec![5000.0, 1.5]);
    }

    #[test]
    fn test_mask_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.nc");
        let mask = Array2::from_shape_fn((7, 11), |(r, c)| (r + c) % 3 == 0);

        write_mask_netcdf(&mask, &path, None, "cloud_mask").unwrap();
        let read = read_mask_netcdf(&path, "cloud_mask").unwrap();

        assert_eq!(read.dim(), (7, 11));
        for (m, v) in mask.iter().zip(read.iter()) {
            assert_eq!(*m as u8, *v);
        }
    }

    #[test]
    fn test_mask_uses_template_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.nc");
        let mask = Array2::from_elem((3, 2), true);
        let template = Coordinates {
            y: vec![40.0, 39.5, 39.0],
            x: vec![100.0, 100.5],
        };

        write_mask_netcdf(&mask, &path, Some(&template), "cloud_mask").unwrap();

        let file = netcdf::open(&path).unwrap();
        let y: Vec<f64> = file.variable("y").unwrap().get_values(..).unwrap();
        let x: Vec<f64> = file.variable("x").unwrap().get_values(..).unwrap();
        assert_eq!(y, template.y);
        assert_eq!(x, template.x);
    }

    #[test]
    fn test_converted_dataset_band_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("converted.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("time", 2).unwrap();
            file.add_dimension("y", 2).unwrap();
            file.add_dimension("x", 3).unwrap();
            let mut var = file
                .add_variable::<u16>("Band1", &["y", "x", "time"])
                .unwrap();
            var.put_attribute("units", "1").unwrap();
            // (y, x, time) row-major
            let values: Vec<u16> = (0..12).map(|v| v * 1000).collect();
            var.put_values(&values, ..).unwrap();
        }

        let dataset = ConvertedDataset::open(&path).unwrap();
        let name = dataset.select_variable("MULTI").unwrap();
        assert_eq!(name, "Band1");

        let band = dataset.read_band(&name).unwrap();
        assert_eq!(band.data.dim(), (2, 3));
        assert_eq!(band.dims, vec!["y".to_string(), "x".to_string()]);
        assert_eq!(band.units.as_deref(), Some("1"));
        // time index 0 of element (1, 2) is flat index (1*3 + 2) * 2
        assert_eq!(band.data[[1, 2]], 10000.0);

        let coords = dataset.coordinates(&band);
        assert_eq!(coords, Coordinates::indices(2, 3));
    }

    #[test]
    fn test_no_suitable_variable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.nc");
        {
            let mut file = netcdf::create(&path).unwrap();
            file.add_dimension("x", 3).unwrap();
            let mut var = file.add_variable::<f64>("x", &["x"]).unwrap();
            var.put_values(&[0.0f64, 1.0, 2.0][..], ..).unwrap();
        }

        let dataset = ConvertedDataset::open(&path).unwrap();
        assert_eq!(dataset.path(), path.as_path());
        match dataset.select_variable("MULTI") {
            Err(CloudMaskError::NoSuitableVariable(source)) => {
                assert_eq!(source, path.display().to_string());
            }
            other => panic!("expected NoSuitableVariable, got {:?}", other),
        }
    }
}
