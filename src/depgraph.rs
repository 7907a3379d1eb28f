//! Stage 3a: dependency sorter (spec §4.5).
//!
//! Builds a directed graph over the record types scheduled for emission
//! (an edge `A -> B` iff a field of `A` references record `B`), closes it
//! over the symbol table so every referenced record is included, then
//! topologically sorts with a deterministic tie-break and reports any
//! cycle rather than failing the run.
//!
//! Directly grounded on this codebase's own file-dependency resolver
//! (`src/schema_loader.rs`'s `topological_sort`/`find_cycles`), adapted
//! from sorting `.sql` files to sorting record types.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use once_cell::sync::Lazy;
use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;
use regex::Regex;

use crate::error::CycleWarning;
use crate::model::RecordSchema;
use crate::symbols::SymbolTable;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z][A-Za-z0-9_]*").unwrap());

/// Identifiers that can appear capitalized in a resolved Rust type but are
/// never record struct names.
const BUILTIN_NAMES: &[&str] = &["Option", "Vec", "String", "HashMap", "BTreeMap", "Uuid", "NaiveDate", "NaiveDateTime", "NaiveTime", "DateTime", "Utc", "Decimal", "Value", "Box"];

fn record_references(rust_type: &str, known: &HashSet<String>, self_name: &str) -> Vec<String> {
    IDENTIFIER
        .find_iter(rust_type)
        .map(|m| m.as_str().to_string())
        .filter(|name| name != self_name && known.contains(name) && !BUILTIN_NAMES.contains(&name.as_str()))
        .collect()
}

fn lookup_by_struct_name<'a>(symbols: &'a SymbolTable, struct_name: &str) -> Option<&'a RecordSchema> {
    symbols
        .records_in_order()
        .into_iter()
        .find(|r| r.struct_name == struct_name)
}

/// Closes `initial` over the symbol table (any field reference to a
/// table/composite not yet scheduled pulls that record in too) and returns
/// the full emission set, topologically sorted so no record names an
/// undefined record before it (spec invariant §8.1), along with a cycle
/// warning if the graph has one.
pub fn collect_and_sort(
    initial: Vec<RecordSchema>,
    symbols: &SymbolTable,
) -> (Vec<RecordSchema>, Option<CycleWarning>) {
    let mut by_name: HashMap<String, RecordSchema> = HashMap::new();
    for schema in initial {
        by_name.insert(schema.struct_name.clone(), schema);
    }

    // Closure: repeatedly pull in any referenced-but-missing record.
    loop {
        let known: HashSet<String> = by_name.keys().cloned().collect();
        let mut to_add = Vec::new();
        for schema in by_name.values() {
            for column in &schema.columns {
                for reference in record_references(&column.rust_type, &known, &schema.struct_name) {
                    if !by_name.contains_key(&reference) {
                        to_add.push(reference);
                    }
                }
            }
        }
        // Also resolve references to names not yet known at all (not in
        // `known` because they were never added), by scanning against the
        // full symbol table's struct names.
        for schema in by_name.values() {
            for column in &schema.columns {
                for candidate in IDENTIFIER.find_iter(&column.rust_type) {
                    let candidate = candidate.as_str();
                    if candidate != schema.struct_name
                        && !BUILTIN_NAMES.contains(&candidate)
                        && !by_name.contains_key(candidate)
                        && lookup_by_struct_name(symbols, candidate).is_some()
                    {
                        to_add.push(candidate.to_string());
                    }
                }
            }
        }
        if to_add.is_empty() {
            break;
        }
        let mut added_any = false;
        for name in to_add {
            if by_name.contains_key(&name) {
                continue;
            }
            if let Some(found) = lookup_by_struct_name(symbols, &name) {
                by_name.insert(name, found.clone());
                added_any = true;
            }
        }
        if !added_any {
            break;
        }
    }

    let all_names: HashSet<String> = by_name.keys().cloned().collect();
    let mut dependencies: HashMap<String, HashSet<String>> = HashMap::new();
    for (name, schema) in &by_name {
        let mut deps = HashSet::new();
        for column in &schema.columns {
            for reference in record_references(&column.rust_type, &all_names, name) {
                deps.insert(reference);
            }
        }
        dependencies.insert(name.clone(), deps);
    }

    let (order, cycle) = topological_sort(&all_names, &dependencies);
    let schemas: Vec<RecordSchema> = order
        .into_iter()
        .filter_map(|name| by_name.get(&name).cloned())
        .collect();

    let warning = cycle.map(|members| CycleWarning { members });
    (schemas, warning)
}

/// Kahn's algorithm with a deterministic (alphabetical) tie-break among
/// nodes that become ready simultaneously, matching the discipline this
/// codebase's own schema loader already applies to its file ordering.
fn topological_sort(
    nodes: &HashSet<String>,
    dependencies: &HashMap<String, HashSet<String>>,
) -> (Vec<String>, Option<Vec<String>>) {
    let mut in_degree: HashMap<String, usize> = nodes
        .iter()
        .map(|n| (n.clone(), dependencies.get(n).map(|d| d.len()).unwrap_or(0)))
        .collect();

    let mut ready: Vec<String> = nodes
        .iter()
        .filter(|n| in_degree[*n] == 0)
        .cloned()
        .collect();
    ready.sort();

    let mut sorted = Vec::new();
    while !ready.is_empty() {
        ready.sort();
        let current = ready.remove(0);
        sorted.push(current.clone());
        for (node, deps) in dependencies {
            if deps.contains(&current) {
                let entry = in_degree.get_mut(node).unwrap();
                *entry -= 1;
                if *entry == 0 && !sorted.contains(node) && !ready.contains(node) {
                    ready.push(node.clone());
                }
            }
        }
    }

    if sorted.len() == nodes.len() {
        return (sorted, None);
    }

    let remaining: Vec<String> = nodes.iter().filter(|n| !sorted.contains(n)).cloned().collect();
    let cycle_members = find_cycle_members(&remaining, dependencies);
    let mut tail = remaining.clone();
    tail.sort();
    sorted.extend(tail);
    (sorted, Some(cycle_members))
}

/// Restricts the graph to `remaining` nodes and runs `tarjan_scc` to find
/// which of them form an actual cycle (as opposed to merely depending on a
/// cyclic component without being part of the cycle themselves), mirroring
/// this codebase's own `find_cycles`/`format_cycle` approach.
fn find_cycle_members(remaining: &[String], dependencies: &HashMap<String, HashSet<String>>) -> Vec<String> {
    let remaining_set: HashSet<&String> = remaining.iter().collect();
    let mut graph = DiGraph::<String, ()>::new();
    let mut indices = HashMap::new();
    for node in remaining {
        indices.insert(node.clone(), graph.add_node(node.clone()));
    }
    for node in remaining {
        if let Some(deps) = dependencies.get(node) {
            for dep in deps {
                if remaining_set.contains(dep) {
                    graph.add_edge(indices[node], indices[dep], ());
                }
            }
        }
    }
    let sccs = tarjan_scc(&graph);
    let members: Vec<String> = sccs
        .into_iter()
        .filter(|scc| scc.len() > 1)
        .flat_map(|scc| scc.into_iter().map(|idx| graph[idx].clone()))
        .unique()
        .sorted()
        .collect();
    if members.is_empty() {
        return remaining.iter().cloned().sorted().collect();
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use crate::model::RecordSchemaKind;

    fn schema(name: &str, fields: &[(&str, &str)]) -> RecordSchema {
        RecordSchema {
            struct_name: name.to_string(),
            sql_name: name.to_lowercase(),
            columns: fields
                .iter()
                .map(|(field, ty)| crate::model::ReturnColumn {
                    name: field.to_string(),
                    sql_type: "text".to_string(),
                    rust_type: ty.to_string(),
                    is_optional: true,
                })
                .collect(),
            imports: BTreeSet::new(),
            kind: RecordSchemaKind::Table,
        }
    }

    #[test]
    fn orders_dependencies_before_dependents() {
        let symbols = SymbolTable::new();
        let meter = schema("Meter", &[("id", "Option<i32>")]);
        let upsert = schema("MeterUpsert", &[("meter", "Option<Meter>"), ("was_created", "Option<bool>")]);
        let (sorted, cycle) = collect_and_sort(vec![upsert, meter], &symbols);
        assert!(cycle.is_none());
        let position = |name: &str| sorted.iter().position(|s| s.struct_name == name).unwrap();
        assert!(position("Meter") < position("MeterUpsert"));
    }

    #[test]
    fn detects_and_reports_cycle_but_still_emits() {
        let symbols = SymbolTable::new();
        let a = schema("A", &[("b", "Option<B>")]);
        let b = schema("B", &[("a", "Option<A>")]);
        let (sorted, cycle) = collect_and_sort(vec![a, b], &symbols);
        assert_eq!(sorted.len(), 2);
        let warning = cycle.unwrap();
        assert_eq!(warning.members, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn independent_records_sort_alphabetically() {
        let symbols = SymbolTable::new();
        let z = schema("Zebra", &[]);
        let a = schema("Apple", &[]);
        let (sorted, cycle) = collect_and_sort(vec![z, a], &symbols);
        assert!(cycle.is_none());
        assert_eq!(sorted[0].struct_name, "Apple");
        assert_eq!(sorted[1].struct_name, "Zebra");
    }
}
