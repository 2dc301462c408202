// In-memory datasets shaped like the UKCP18 60km files, small enough to
// reason about by hand: 4 daily steps on a 3 x 4 grid.

use crate::dataset::{AttrValue, Dataset, Variable};

pub(crate) const BASE_LAT: [f64; 3] = [-60.0, 0.0, 60.0];
pub(crate) const BASE_LON: [f64; 4] = [0.0, 90.0, 180.0, 270.0];

/// 1899-12-01T12:00 in hours since 1970-01-01 on a 360-day calendar.
pub(crate) const FIRST_HOUR: f64 = -605_508.0;

pub(crate) fn file_name(variable: &str) -> String {
    format!("{variable}_rcp26_land-gcm_global_60km_01_day_18991201-19091130.nc")
}

/// A file on the shared grid.
pub(crate) fn grid(variable: &str) -> Dataset {
    build(variable, &BASE_LAT, &BASE_LON)
}

/// A wind file: one extra southern row and slightly offset coordinates.
pub(crate) fn wind_grid(variable: &str) -> Dataset {
    let lat: Vec<f64> = std::iter::once(-90.0)
        .chain(BASE_LAT.iter().map(|v| v + 0.1))
        .collect();
    let lon: Vec<f64> = BASE_LON.iter().map(|v| v + 0.05).collect();
    build(variable, &lat, &lon)
}

fn build(variable: &str, lat: &[f64], lon: &[f64]) -> Dataset {
    let mut ds = Dataset::new();
    ds.add_dimension("time", 4)
        .add_dimension("latitude", lat.len())
        .add_dimension("longitude", lon.len())
        .add_dimension("bnds", 2);
    ds.attrs.insert("title".into(), "UKCP18 fixture".into());
    ds.attrs
        .insert("label_units".into(), AttrValue::Strs(vec!["°C".to_string()]));

    let time: Vec<f64> = (0..4).map(|i| FIRST_HOUR + 24.0 * f64::from(i)).collect();
    let vars = [
        (
            "time",
            Variable::coordinate(&["time"], time)
                .with_attr("axis", "T")
                .with_attr("standard_name", "time")
                .with_attr("units", "hours since 1970-01-01 00:00:00")
                .with_attr("calendar", "360_day"),
        ),
        (
            "latitude",
            Variable::coordinate(&["latitude"], lat.to_vec())
                .with_attr("axis", "Y")
                .with_attr("units", "degrees_north")
                .with_attr("standard_name", "latitude")
                .with_attr("bounds", "latitude_bnds"),
        ),
        (
            "longitude",
            Variable::coordinate(&["longitude"], lon.to_vec())
                .with_attr("axis", "X")
                .with_attr("units", "degrees_east")
                .with_attr("standard_name", "longitude")
                .with_attr("bounds", "longitude_bnds"),
        ),
        (
            "latitude_bnds",
            Variable::bounds(
                &["latitude", "bnds"],
                lat.iter().flat_map(|v| [v - 30.0, v + 30.0]).collect(),
            ),
        ),
        (
            "longitude_bnds",
            Variable::bounds(
                &["longitude", "bnds"],
                lon.iter().flat_map(|v| [v - 45.0, v + 45.0]).collect(),
            ),
        ),
        (
            "height",
            Variable::coordinate(&[], vec![10.0])
                .with_attr("units", "m")
                .with_attr("standard_name", "height"),
        ),
        (
            variable,
            Variable::data(&["time", "latitude", "longitude"])
                .with_attr("long_name", long_name(variable))
                .with_attr("units", "1")
                .with_attr("coordinates", "height")
                .with_attr("plot_label", vec![format!("{variable} plot label")]),
        ),
    ];
    for (name, var) in vars {
        ds.insert(name, var).expect("fixture variable fits its grid");
    }
    ds
}

fn long_name(variable: &str) -> &'static str {
    match variable {
        "tas" => "Mean air temperature at 1.5m",
        "pr" => "Precipitation rate",
        "sfcWind" => "Wind speed at 10m",
        "uas" => "Eastward wind at 10m",
        "vas" => "Northward wind at 10m",
        _ => "UKCP18 variable",
    }
}
