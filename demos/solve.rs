/*
 * Copyright (c) 2022 Frank Fischer <frank-fischer@shadow-soft.de>
 *
 * This program is free software: you can redistribute it and/or
 * modify it under the terms of the GNU General Public License as
 * published by the Free Software Foundation, either version 3 of the
 * License, or (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful, but
 * WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
 * General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see  <http://www.gnu.org/licenses/>
 */

use rs_netflow::netflow::{multi, single};
use rs_netflow::{dimacs, json, DataSet, Options};
use std::error::Error;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::result::Result;

use rustop::opts;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

enum Format {
    Multi,
    Single,
    Dimacs,
}

fn read(filename: &str, format: &Format) -> Result<DataSet, Box<dyn Error>> {
    Ok(match format {
        Format::Multi => json::read_from_file(&multi::input_schema(), filename)?,
        Format::Single => json::read_from_file(&single::input_schema(), filename)?,
        Format::Dimacs => dimacs::read_from_file(filename)?,
    })
}

fn run(filename: &str, format: Format, opts: &Options, output: Option<&str>) -> Result<(), Box<dyn Error>> {
    let tstart = OffsetDateTime::now_utc();
    let dat = read(filename, &format)?;
    let tend = OffsetDateTime::now_utc();

    println!("Instance            : {}", filename);
    println!("Read Time (seconds) : {}", (tend - tstart).as_seconds_f64());
    for table in dat.tables() {
        println!("{:20}: {} rows", format!("Table {}", table.name()), table.len());
    }

    let tstart = OffsetDateTime::now_utc();
    let sol = match format {
        Format::Multi => multi::solve_with(&dat, opts)?,
        Format::Single | Format::Dimacs => single::solve_with(&dat, opts)?,
    };
    let tend = OffsetDateTime::now_utc();
    let soltime = (tend - tstart).as_seconds_f64();

    println!();
    println!("Time (seconds)      : {:.2}", soltime);
    let sol = match sol {
        Some(sol) => sol,
        None => {
            println!("Solution state      : no optimal solution");
            return Ok(());
        }
    };
    if let Some(value) = sol
        .table("parameters")
        .and_then(|t| t.rows().next())
        .and_then(|row| row.number("Value"))
    {
        println!("Value               : {:.2}", value);
    }

    match format {
        Format::Dimacs => {
            let solfile = PathBuf::from(output.map(String::from).unwrap_or_else(|| format!("{}.sol", filename)));
            println!("Write solution to   : {}", solfile.display());
            let f = &mut std::fs::File::create(&solfile)?;
            writeln!(f, "c Solved as linear program")?;
            writeln!(f, "c instance            : {}", filename)?;
            writeln!(f, "c solution time       : {:.2} seconds", soltime)?;
            dimacs::write_solution(f, &sol)?;
        }
        _ => match output {
            Some(output) => {
                println!("Write solution to   : {}", output);
                json::write_to_file(&sol, output)?;
            }
            None => println!("{}", json::to_string(&sol)?),
        },
    }

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let (args, _) = opts! {
        synopsis "Solve a min-cost-flow problem given as JSON data set or DIMACS file.";
        param file:String, desc:"Instance file name (*.json or *.min)";
        opt single:bool, desc:"The JSON data set is a single-commodity instance";
        opt config:Option<String>, desc:"TOML file with solver options";
        opt output:Option<String>, desc:"Write the solution to this file";
    }
    .parse_or_exit();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let opts = match &args.config {
        Some(config) => Options::load(config)?,
        None => Options::default(),
    };

    let format = if Path::new(&args.file).extension().map(|ext| ext == "min").unwrap_or(false) {
        Format::Dimacs
    } else if args.single {
        Format::Single
    } else {
        Format::Multi
    };

    run(&args.file, format, &opts, args.output.as_deref())
}
