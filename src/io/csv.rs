use ::csv;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::Path;
use nalgebra::DMatrix;
use crate::sim::SimulatedData;
use crate::fit::filter::{FilterOutput, KalmanOutput};
use crate::fit::walk::Chain;
use super::{IoError, IoResult};

fn is_missing(entry : &str) -> bool {
    let e = entry.trim();
    e.is_empty() || e.eq_ignore_ascii_case("na") || e.eq_ignore_ascii_case("nan")
}

fn parse_entry(entry : &str, line : usize) -> IoResult<f64> {
    if is_missing(entry) {
        return Ok(f64::NAN);
    }
    entry.trim().parse::<f64>()
        .map_err(|_| IoError::Parse { value : entry.to_string(), line })
}

/// A first row whose fields all read as numbers (or missing markers) is data,
/// not a header.
fn is_data_row(record : &csv::StringRecord) -> bool {
    record.iter().all(|e| is_missing(e) || e.trim().parse::<f64>().is_ok() )
}

/// Reads one column of observations. The column is chosen by header name, or
/// is the first column when `column` is None; files without a header row are
/// read from their first line. Empty, `NA` and `NaN` cells become NaN.
pub fn read_observations<R>(reader : R, column : Option<&str>) -> IoResult<Vec<f64>>
where
    R : Read
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = csv_reader.records();
    let first = match records.next() {
        Some(rec) => rec?,
        None => return Err(IoError::Empty)
    };

    let mut y = Vec::new();
    let ix = if is_data_row(&first) {
        if let Some(name) = column {
            return Err(IoError::MissingColumn(name.to_string()));
        }
        y.push(parse_entry(first.get(0).unwrap_or(""), 1)?);
        0
    } else {
        match column {
            Some(name) => first.iter().position(|h| h.trim() == name )
                .ok_or_else(|| IoError::MissingColumn(name.to_string()))?,
            None => 0
        }
    };

    for (i, rec) in records.enumerate() {
        let rec = rec?;
        y.push(parse_entry(rec.get(ix).unwrap_or(""), i + 2)?);
    }
    if y.is_empty() {
        return Err(IoError::Empty);
    }
    Ok(y)
}

pub fn read_observations_from_path<P>(path : P, column : Option<&str>) -> IoResult<Vec<f64>>
where
    P : AsRef<Path>
{
    read_observations(File::open(path)?, column)
}

fn format_entry(v : f64) -> String {
    if v.is_nan() { String::from("NA") } else { v.to_string() }
}

/// Writes equally-long columns under the given header. NaN is written as NA.
pub fn write_columns<W>(writer : W, header : &[&str], columns : &[&[f64]]) -> IoResult<()>
where
    W : Write
{
    let n = columns.iter().map(|c| c.len() ).max().unwrap_or(0);
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header)?;
    for t in 0..n {
        let row = columns.iter()
            .map(|c| c.get(t).map(|v| format_entry(*v) ).unwrap_or_default() );
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the rows of a matrix under the given header.
pub fn write_matrix<W>(writer : W, header : &[String], m : &DMatrix<f64>) -> IoResult<()>
where
    W : Write
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header)?;
    for row in m.row_iter() {
        wtr.write_record(row.iter().map(|v| format_entry(*v) ))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn create_file<P>(path : P) -> IoResult<File>
where
    P : AsRef<Path>
{
    Ok(OpenOptions::new().write(true).create(true).truncate(true).open(path)?)
}

/// Columns `t,x,y`.
pub fn write_simulated<W>(writer : W, data : &SimulatedData) -> IoResult<()>
where
    W : Write
{
    let t : Vec<f64> = (0..data.len()).map(|t| t as f64 ).collect();
    write_columns(writer, &["t", "x", "y"], &[&t, &data.x, &data.y])
}

/// Columns `t,x_hat`, one row per filtered state.
pub fn write_filter_output<W>(writer : W, out : &FilterOutput) -> IoResult<()>
where
    W : Write
{
    let t : Vec<f64> = (0..out.x_hat_filtered.len()).map(|t| t as f64 ).collect();
    write_columns(writer, &["t", "x_hat"], &[&t, &out.x_hat_filtered])
}

/// Columns `t,x_hat,variance,log_predictive`.
pub fn write_kalman_output<W>(writer : W, out : &KalmanOutput) -> IoResult<()>
where
    W : Write
{
    let t : Vec<f64> = (0..out.x_hat_filtered.len()).map(|t| t as f64 ).collect();
    write_columns(
        writer,
        &["t", "x_hat", "variance", "log_predictive"],
        &[&t, &out.x_hat_filtered, &out.filtered_variance, &out.log_predictive]
    )
}

/// One row per iteration: accepted parameters, log-likelihood and acceptance flag.
pub fn write_chain<W>(writer : W, chain : &Chain) -> IoResult<()>
where
    W : Write
{
    let mut header = chain.names.clone();
    header.push(String::from("log_likelihood"));
    header.push(String::from("accepted"));
    let mut m = chain.theta.clone().insert_columns(chain.theta.ncols(), 2, 0.0);
    let p = chain.theta.ncols();
    for k in 0..chain.len() {
        m[(k, p)] = chain.log_likelihood[k];
        m[(k, p + 1)] = if chain.accepted[k] { 1.0 } else { 0.0 };
    }
    write_matrix(writer, &header, &m)
}
