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

use std::collections::HashMap;
use std::error::Error;

use proptest::prelude::*;
use rs_netflow::netflow::{multi, single};
use rs_netflow::{json, key, CostReferences, DataSet, Key, Options, Value};

const EPS: f64 = 1e-5;

fn nearly_same(x: f64, y: f64) -> bool {
    (x - y).abs() <= EPS * (1.0 + x.abs().max(y.abs()))
}

fn total_cost(sol: &DataSet) -> f64 {
    sol.table("parameters")
        .and_then(|t| t.get(&key!["Total Cost"]))
        .and_then(|row| row.number("Value"))
        .expect("missing total cost")
}

/// Check conservation, capacities, cost consistency and sparsity of a
/// multi-commodity solution.
fn check_solution(dat: &DataSet, sol: &DataSet) {
    let flow = sol.table("flow").unwrap();
    let quantity = |key: &Key| flow.get(key).and_then(|row| row.number("Quantity")).unwrap_or(0.0);

    for row in flow.rows() {
        assert!(row.number("Quantity").unwrap() > 0.0, "zero flow {:?}", row.key());
        assert!(dat.table("cost").unwrap().contains_key(row.key()));
    }

    let mut balance: HashMap<(Value, Value), f64> = HashMap::new();
    for row in flow.rows() {
        let (c, i, j) = (&row.key()[0], &row.key()[1], &row.key()[2]);
        let x = row.number("Quantity").unwrap();
        *balance.entry((c.clone(), i.clone())).or_insert(0.0) -= x;
        *balance.entry((c.clone(), j.clone())).or_insert(0.0) += x;
    }
    for c in dat.table("commodities").unwrap().keys() {
        for n in dat.table("nodes").unwrap().keys() {
            let inflow = dat
                .table("inflow")
                .unwrap()
                .get(&[c[0].clone(), n[0].clone()])
                .and_then(|row| row.number("Quantity"))
                .unwrap_or(0.0);
            let net = balance.get(&(c[0].clone(), n[0].clone())).copied().unwrap_or(0.0);
            assert!(nearly_same(net + inflow, 0.0), "conservation violated at {:?}, {:?}", c, n);
        }
    }

    let volume = |c: &Value| {
        dat.table("commodities")
            .unwrap()
            .get(&[c.clone()])
            .and_then(|row| row.number("Volume"))
            .unwrap()
    };
    for arc in dat.table("arcs").unwrap().rows() {
        let cap = arc.number("Capacity").unwrap();
        let used = flow
            .rows()
            .filter(|row| row.key()[1..] == arc.key()[..])
            .map(|row| volume(&row.key()[0]) * row.number("Quantity").unwrap())
            .sum::<f64>();
        assert!(used <= cap * (1.0 + EPS), "capacity of {:?} exceeded", arc.key());
    }

    let cost = dat
        .table("cost")
        .unwrap()
        .rows()
        .map(|row| row.number("Cost").unwrap() * quantity(row.key()))
        .sum::<f64>();
    assert!(nearly_same(cost, total_cost(sol)));
}

#[test]
fn sample() -> Result<(), Box<dyn Error>> {
    let dat = json::read_from_file(&multi::input_schema(), "tests/data/sample.json")?;
    let sol = multi::solve(&dat)?.expect("sample is feasible");
    check_solution(&dat, &sol);
    assert!(nearly_same(total_cost(&sol), 5500.0));

    // the same model without the compound foreign key
    let opts = Options::default().with_cost_references(CostReferences::Nodes);
    let sol = multi::solve_with(&dat, &opts)?.expect("sample is feasible");
    assert!(nearly_same(total_cost(&sol), 5500.0));
    Ok(())
}

#[test]
fn two_commodities() -> Result<(), Box<dyn Error>> {
    let dat = json::read_from_file(&multi::input_schema(), "tests/data/two_commodity.json")?;
    let sol = multi::solve(&dat)?.expect("instance is feasible");
    check_solution(&dat, &sol);

    let expected = vec![
        (key![2, 3, 2], 2.0),
        (key![2, 2, 5], 2.0),
        (key![2, 5, 6], 2.0),
        (key![1, 1, 2], 3.0),
        (key![1, 2, 5], 3.0),
        (key![1, 5, 4], 3.0),
        (key![1, 1, 4], 2.0),
    ];
    let flow = sol.table("flow").unwrap();
    assert_eq!(flow.len(), expected.len());
    for (key, x) in expected {
        let q = flow.get(&key).and_then(|row| row.number("Quantity"));
        assert!(q.map(|q| nearly_same(q, x)).unwrap_or(false), "flow {:?} is {:?}", key, q);
    }
    assert!(nearly_same(total_cost(&sol), 19.0));
    Ok(())
}

#[test]
fn volumes_weight_capacities() -> Result<(), Box<dyn Error>> {
    // a heavy commodity takes two units of capacity per unit of flow
    let dat = json::read_str(
        &multi::input_schema(),
        r#"{
            "commodities": [["Heavy", 2], ["Light", 1]],
            "nodes": [["s"], ["m"], ["t"]],
            "arcs": [["s", "t", 10], ["s", "m"], ["m", "t"]],
            "cost": [
                ["Heavy", "s", "t", 1],
                ["Heavy", "s", "m", 2],
                ["Heavy", "m", "t", 2],
                ["Light", "s", "t", 1]
            ],
            "inflow": [
                ["Heavy", "s", 8], ["Heavy", "t", -8],
                ["Light", "s", 2], ["Light", "t", -2]
            ]
        }"#,
    )?;
    let sol = multi::solve(&dat)?.expect("instance is feasible");
    check_solution(&dat, &sol);

    // 2 * 4 + 2 fills the direct arc, the rest of Heavy goes around
    let flow = sol.table("flow").unwrap();
    for (key, x) in vec![
        (key!["Heavy", "s", "t"], 4.0),
        (key!["Heavy", "s", "m"], 4.0),
        (key!["Heavy", "m", "t"], 4.0),
        (key!["Light", "s", "t"], 2.0),
    ] {
        let q = flow.get(&key).and_then(|row| row.number("Quantity"));
        assert!(q.map(|q| nearly_same(q, x)).unwrap_or(false), "flow {:?} is {:?}", key, q);
    }
    assert!(nearly_same(total_cost(&sol), 22.0));
    Ok(())
}

#[test]
fn removed_arc_breaks_cost_references() -> Result<(), Box<dyn Error>> {
    let mut dat = json::read_from_file(&multi::input_schema(), "tests/data/sample.json")?;
    let sol = multi::solve(&dat)?.expect("sample is feasible");

    let mut used: HashMap<Key, f64> = dat.table("arcs").unwrap().keys().map(|k| (k.clone(), 0.0)).collect();
    for row in sol.table("flow").unwrap().rows() {
        *used.get_mut(&row.key()[1..]).unwrap() += row.number("Quantity").unwrap();
    }
    let (least, _) = used
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .unwrap();
    assert_eq!(least, key!["Detroit", "Seattle"]);

    dat.table_mut("arcs").unwrap().remove(&least);
    match multi::solve(&dat) {
        Err(rs_netflow::Error::ForeignKey(failures)) => {
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].child, "cost");
            assert_eq!(failures[0].values, least);
            assert_eq!(failures[0].rows.len(), 2);
        }
        r => panic!("unexpected result {:?}", r),
    }

    // without the compound foreign key the cost rows are simply unused
    let opts = Options::default().with_cost_references(CostReferences::Nodes);
    let sol = multi::solve_with(&dat, &opts)?.expect("sample is still feasible");
    check_solution(&dat, &sol);
    assert!(nearly_same(total_cost(&sol), 5500.0));
    Ok(())
}

#[test]
fn invalid_inputs() -> Result<(), Box<dyn Error>> {
    let schema = multi::input_schema();
    let mut dat = json::read_from_file(&schema, "tests/data/sample.json")?;
    dat.table_mut("commodities")
        .unwrap()
        .insert(key!["Pens"], vec![Value::from(0)]);
    assert!(matches!(multi::solve(&dat), Err(rs_netflow::Error::DataType(_))));

    let mut dat = json::read_from_file(&schema, "tests/data/sample.json")?;
    dat.table_mut("inflow")
        .unwrap()
        .insert(key!["Markers", "Boston"], vec![Value::from(1)]);
    assert!(matches!(multi::solve(&dat), Err(rs_netflow::Error::ForeignKey(_))));

    let mut dat = json::read_from_file(&schema, "tests/data/sample.json")?;
    dat.remove_table("inflow");
    assert!(matches!(multi::solve(&dat), Err(rs_netflow::Error::Structure(_))));
    Ok(())
}

#[test]
fn infeasible() -> Result<(), Box<dyn Error>> {
    let mut dat = json::read_from_file(&multi::input_schema(), "tests/data/sample.json")?;
    // more than the capacity of all arcs into Boston
    dat.table_mut("inflow")
        .unwrap()
        .insert(key!["Pens", "Boston"], vec![Value::from(-240)]);
    dat.table_mut("inflow")
        .unwrap()
        .insert(key!["Pens", "Detroit"], vec![Value::from(260)]);
    assert!(multi::solve(&dat)?.is_none());
    Ok(())
}

/// A transportation problem with one commodity, as multi- and as
/// single-commodity data set.
fn transportation(supplies: &[u32], demands: &[u32], costs: &[u32]) -> (DataSet, DataSet) {
    let mut multi_dat = multi::input_schema().new_data();
    let mut single_dat = single::input_schema().new_data();
    multi_dat.table_mut("commodities").unwrap().insert_default(key!["c"]);

    let total_supply: u32 = supplies.iter().sum();
    let total_demand: u32 = demands.iter().sum();
    let mut sources = supplies
        .iter()
        .enumerate()
        .map(|(i, &s)| (format!("s{}", i), f64::from(s)))
        .collect::<Vec<_>>();
    let mut sinks = demands
        .iter()
        .enumerate()
        .map(|(j, &d)| (format!("t{}", j), -f64::from(d)))
        .collect::<Vec<_>>();
    // balance supply and demand on the last source or sink
    let excess = f64::from(total_supply) - f64::from(total_demand);
    if excess > 0.0 {
        if let Some(last) = sinks.last_mut() {
            last.1 -= excess;
        }
    } else if let Some(last) = sources.last_mut() {
        last.1 -= excess;
    }

    for (name, b) in sources.iter().chain(sinks.iter()) {
        multi_dat.table_mut("nodes").unwrap().insert_default(key![name.as_str()]);
        multi_dat
            .table_mut("inflow")
            .unwrap()
            .insert(key!["c", name.as_str()], vec![Value::from(*b)]);
        single_dat
            .table_mut("nodes")
            .unwrap()
            .insert(key![name.as_str()], vec![Value::from(*b)]);
    }

    let mut k = 0;
    for (s, _) in &sources {
        for (t, _) in &sinks {
            let c = Value::from(costs[k % costs.len()]);
            k += 1;
            multi_dat
                .table_mut("arcs")
                .unwrap()
                .insert_default(key![s.as_str(), t.as_str()]);
            multi_dat
                .table_mut("cost")
                .unwrap()
                .insert(key!["c", s.as_str(), t.as_str()], vec![c.clone()]);
            single_dat
                .table_mut("arcs")
                .unwrap()
                .insert(key![s.as_str(), t.as_str()], vec![c]);
        }
    }

    (multi_dat, single_dat)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn transportation_problems(
        supplies in prop::collection::vec(1u32..20, 1..4),
        demands in prop::collection::vec(1u32..20, 1..4),
        costs in prop::collection::vec(0u32..10, 1..12),
    ) {
        let (multi_dat, single_dat) = transportation(&supplies, &demands, &costs);
        let multi_sol = multi::solve(&multi_dat).unwrap();
        let single_sol = single::solve(&single_dat).unwrap();

        // balanced and uncapacitated
        let multi_sol = multi_sol.expect("transportation problems are feasible");
        let single_sol = single_sol.expect("transportation problems are feasible");
        check_solution(&multi_dat, &multi_sol);
        prop_assert!(nearly_same(total_cost(&multi_sol), total_cost(&single_sol)));
    }
}
