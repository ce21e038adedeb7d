use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::builder::{GraphBuilder, NewEdge, WayNodeRow};
use crate::error::{Error, Result};
use crate::geo::{BoundingBox, Coordinate, PathPoint};
use crate::permit::{default_permit_rules, PermitClassifier, PermitMask, PermitRule};
use crate::reconstruct::WayGeometry;
use crate::subgraph::{EdgeSource, EnvelopeIndex, StoredEdge};

/// Numeric identifier of a map node.
pub type NodeId = i64;

/// Numeric identifier of a map way.
pub type WayId = i64;

/// Tag key that marks a way as part of the road network.
pub const ROUTABLE_TAG_KEY: &str = "highway";

const MAP_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS nodes (
        node_id INTEGER PRIMARY KEY,
        lon REAL NOT NULL,
        lat REAL NOT NULL
    );
    CREATE TABLE IF NOT EXISTS way_nodes (
        way_id INTEGER NOT NULL,
        node_id INTEGER NOT NULL,
        node_order INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS way_nodes_way_idx ON way_nodes (way_id, node_order);
    CREATE INDEX IF NOT EXISTS way_nodes_node_idx ON way_nodes (node_id);
    CREATE TABLE IF NOT EXISTS way_tags (
        way_id INTEGER NOT NULL,
        key TEXT NOT NULL,
        value TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS way_tags_way_idx ON way_tags (way_id);
    CREATE INDEX IF NOT EXISTS way_tags_key_idx ON way_tags (key);
";

const PERMIT_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS graph_permit (
        key TEXT NOT NULL,
        value TEXT NOT NULL,
        set_bit INTEGER NOT NULL DEFAULT 0,
        clear_bit INTEGER NOT NULL DEFAULT 255
    );
";

const GRAPH_SCHEMA: &str = "
    DROP TABLE IF EXISTS graph_edges;
    CREATE TABLE graph_edges (
        edge_id INTEGER PRIMARY KEY,
        start_node_id INTEGER NOT NULL,
        end_node_id INTEGER NOT NULL,
        dist INTEGER NOT NULL,
        way_id INTEGER NOT NULL,
        permit INTEGER NOT NULL DEFAULT 15
    );
    DROP TABLE IF EXISTS temp.routable_ways;
    CREATE TEMP TABLE routable_ways (way_id INTEGER PRIMARY KEY);
    DROP TABLE IF EXISTS temp.crossing_nodes;
    CREATE TEMP TABLE crossing_nodes (node_id INTEGER PRIMARY KEY);
";

const WAY_NODE_STREAM: &str = "
    SELECT wn.way_id, wn.node_id, wn.node_order, c.node_id IS NOT NULL, n.lon, n.lat
    FROM way_nodes wn
    JOIN routable_ways r ON r.way_id = wn.way_id
    LEFT JOIN crossing_nodes c ON c.node_id = wn.node_id
    LEFT JOIN nodes n ON n.node_id = wn.node_id
    ORDER BY wn.way_id, wn.node_order
";

const ENVELOPE_INDEX: &str = "
    DROP TABLE IF EXISTS rtree_way;
    CREATE VIRTUAL TABLE rtree_way USING rtree(way_id, min_lat, max_lat, min_lon, max_lon);
    INSERT INTO rtree_way (way_id, min_lat, max_lat, min_lon, max_lon)
        SELECT wn.way_id, min(n.lat), max(n.lat), min(n.lon), max(n.lon)
        FROM way_nodes wn
        JOIN routable_ways r ON r.way_id = wn.way_id
        JOIN nodes n ON n.node_id = wn.node_id
        GROUP BY wn.way_id;
    CREATE INDEX graph_edges_way_idx ON graph_edges (way_id);
    DROP TABLE temp.crossing_nodes;
    DROP TABLE temp.routable_ways;
";

/// Summary of a graph build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub routable_ways: usize,
    pub crossing_nodes: usize,
    pub rows_scanned: usize,
    pub edges: usize,
}

/// Summary of a permit classification run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ClassifyReport {
    pub rules: usize,
    pub ways: usize,
    pub edges_updated: usize,
    /// Ways whose tags matched no rule and received the default mask.
    pub defaulted_ways: usize,
}

/// SQLite-backed map storage.
///
/// One store wraps one connection; open a store per thread to run queries
/// concurrently.
#[derive(Debug)]
pub struct MapStore {
    connection: Connection,
}

impl MapStore {
    /// Open an existing map database.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::DatabaseNotFound {
                path: path.to_path_buf(),
            });
        }
        let connection = Connection::open(path)?;
        debug!(path = %path.display(), "opened map database");
        Ok(Self { connection })
    }

    /// Create (or open) a database file and make sure the base tables exist.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let store = Self {
            connection: Connection::open(path)?,
        };
        store.create_map_schema()?;
        Ok(store)
    }

    /// In-memory database with the base tables already created.
    pub fn open_in_memory() -> Result<Self> {
        let store = Self {
            connection: Connection::open_in_memory()?,
        };
        store.create_map_schema()?;
        Ok(store)
    }

    /// Create the node, way and rule tables if they are absent.
    pub fn create_map_schema(&self) -> Result<()> {
        self.connection.execute_batch(MAP_SCHEMA)?;
        self.connection.execute_batch(PERMIT_SCHEMA)?;
        Ok(())
    }

    pub fn insert_node(&self, node_id: NodeId, lon: f64, lat: f64) -> Result<()> {
        self.connection.execute(
            "INSERT OR REPLACE INTO nodes (node_id, lon, lat) VALUES (?1, ?2, ?3)",
            params![node_id, lon, lat],
        )?;
        Ok(())
    }

    /// Store a way's member nodes (in order) and its tags.
    pub fn insert_way<K, V>(
        &mut self,
        way_id: WayId,
        nodes: &[NodeId],
        tags: &[(K, V)],
    ) -> Result<()>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let tx = self.connection.transaction()?;
        {
            let mut member = tx.prepare_cached(
                "INSERT INTO way_nodes (way_id, node_id, node_order) VALUES (?1, ?2, ?3)",
            )?;
            for (order, node_id) in nodes.iter().enumerate() {
                member.execute(params![way_id, node_id, order as i64])?;
            }
            let mut tag = tx
                .prepare_cached("INSERT INTO way_tags (way_id, key, value) VALUES (?1, ?2, ?3)")?;
            for (key, value) in tags {
                tag.execute(params![way_id, key.as_ref(), value.as_ref()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Replace the rule table contents.
    pub fn replace_permit_rules(&mut self, rules: &[PermitRule]) -> Result<usize> {
        let tx = self.connection.transaction()?;
        tx.execute_batch(PERMIT_SCHEMA)?;
        tx.execute("DELETE FROM graph_permit", [])?;
        let inserted = insert_rules(&tx, rules)?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn permit_rules(&self) -> Result<Vec<PermitRule>> {
        if !table_exists(&self.connection, "graph_permit")? {
            return Ok(Vec::new());
        }
        load_rules(&self.connection)
    }

    /// Whether `build_graph` has populated the edge and envelope tables.
    pub fn has_graph(&self) -> Result<bool> {
        Ok(table_exists(&self.connection, "graph_edges")?
            && table_exists(&self.connection, "rtree_way")?)
    }

    pub fn edge_count(&self) -> Result<usize> {
        self.ensure_graph()?;
        let count: i64 = self
            .connection
            .query_row("SELECT count(*) FROM graph_edges", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Permit masks currently stored for the edges of `way_id`.
    pub fn way_permits(&self, way_id: WayId) -> Result<Vec<PermitMask>> {
        self.ensure_graph()?;
        let mut stmt = self
            .connection
            .prepare_cached("SELECT permit FROM graph_edges WHERE way_id = ?1 ORDER BY edge_id")?;
        let rows = stmt.query_map([way_id], |row| row.get::<_, u8>(0))?;
        let mut permits = Vec::new();
        for bits in rows {
            permits.push(PermitMask::from_bits(bits?));
        }
        Ok(permits)
    }

    /// All persisted edges, in insertion order.
    pub fn edges(&self) -> Result<Vec<StoredEdge>> {
        self.ensure_graph()?;
        let mut stmt = self.connection.prepare(&format!("{EDGE_SELECT} ORDER BY e.edge_id"))?;
        let rows = stmt.query_map([], raw_edge)?;
        collect_edges(rows)
    }

    fn ensure_graph(&self) -> Result<()> {
        if self.has_graph()? {
            Ok(())
        } else {
            Err(Error::GraphNotBuilt)
        }
    }

    fn ensure_map_tables(&self) -> Result<()> {
        for table in ["nodes", "way_nodes", "way_tags"] {
            if !table_exists(&self.connection, table)? {
                return Err(Error::UnsupportedSchema);
            }
        }
        Ok(())
    }
}

/// Rebuild `graph_edges` and the way envelope index from the stored ways.
///
/// Runs in a single transaction; on error nothing is written.
pub fn build_graph(store: &mut MapStore) -> Result<BuildReport> {
    store.ensure_map_tables()?;
    let tx = store.connection.transaction()?;
    tx.execute_batch(GRAPH_SCHEMA)?;

    let routable_ways = tx.execute(
        "INSERT INTO routable_ways (way_id) SELECT DISTINCT way_id FROM way_tags WHERE key = ?1",
        [ROUTABLE_TAG_KEY],
    )?;
    let crossing_nodes = tx.execute(
        "INSERT INTO crossing_nodes (node_id)
         SELECT wn.node_id FROM way_nodes wn
         JOIN routable_ways r ON r.way_id = wn.way_id
         GROUP BY wn.node_id HAVING count(*) > 1",
        [],
    )?;
    debug!(routable_ways, crossing_nodes, "prepared way stream");

    let (rows_scanned, edges) = scan_way_nodes(&tx)?;

    tx.execute_batch(ENVELOPE_INDEX)?;
    tx.commit()?;

    let report = BuildReport {
        routable_ways,
        crossing_nodes,
        rows_scanned,
        edges,
    };
    info!(
        ways = report.routable_ways,
        crossings = report.crossing_nodes,
        edges = report.edges,
        "graph build complete"
    );
    Ok(report)
}

fn scan_way_nodes(tx: &Transaction<'_>) -> Result<(usize, usize)> {
    let mut select = tx.prepare(WAY_NODE_STREAM)?;
    let mut insert = tx.prepare(
        "INSERT INTO graph_edges (start_node_id, end_node_id, dist, way_id) VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut store_edge = |edge: NewEdge| -> Result<()> {
        insert.execute(params![
            edge.start_node_id,
            edge.end_node_id,
            edge.distance,
            edge.way_id
        ])?;
        Ok(())
    };

    let mut builder = GraphBuilder::new();
    let mut edges = 0usize;
    let mut rows = select.query([])?;
    while let Some(row) = rows.next()? {
        let way_id: WayId = row.get(0)?;
        let node_id: NodeId = row.get(1)?;
        let lon: Option<f64> = row.get(4)?;
        let lat: Option<f64> = row.get(5)?;
        let (Some(lon), Some(lat)) = (lon, lat) else {
            return Err(Error::malformed(
                way_id,
                node_id,
                "node has no stored coordinates",
            ));
        };
        let closed = builder.push(WayNodeRow {
            way_id,
            node_id,
            node_order: row.get(2)?,
            is_crossing: row.get(3)?,
            lon,
            lat,
        })?;
        if let Some(edge) = closed {
            store_edge(edge)?;
            edges += 1;
        }
    }

    let rows_scanned = builder.rows_seen();
    if let Some(edge) = builder.finish() {
        store_edge(edge)?;
        edges += 1;
    }
    Ok((rows_scanned, edges))
}

/// Recompute the permit mask of every edge from its way's tags.
///
/// Ways without any matching rule get [`PermitMask::DEFAULT`].
pub fn classify_permits(store: &mut MapStore) -> Result<ClassifyReport> {
    store.ensure_graph()?;
    let tx = store.connection.transaction()?;
    tx.execute_batch(PERMIT_SCHEMA)?;

    let rules = load_rules(&tx)?;
    let classifier = PermitClassifier::new(&rules);

    let mut assignments: Vec<(WayId, PermitMask)> = Vec::new();
    let mut defaulted_ways = 0usize;
    {
        let mut stmt = tx.prepare(
            "SELECT w.way_id, t.key, t.value
             FROM (SELECT DISTINCT way_id FROM graph_edges) w
             LEFT JOIN way_tags t ON t.way_id = w.way_id
             ORDER BY w.way_id",
        )?;
        let mut rows = stmt.query([])?;
        let mut current: Option<WayId> = None;
        let mut tags: Vec<(String, String)> = Vec::new();
        let mut flush = |way_id: WayId, tags: &mut Vec<(String, String)>| {
            let result = classifier.classify(tags.as_slice());
            if result.used_default() {
                debug!(way_id, "no permit rule matched way tags");
                defaulted_ways += 1;
            }
            assignments.push((way_id, result.permit));
            tags.clear();
        };

        while let Some(row) = rows.next()? {
            let way_id: WayId = row.get(0)?;
            if let Some(previous) = current.filter(|id| *id != way_id) {
                flush(previous, &mut tags);
            }
            current = Some(way_id);
            let key: Option<String> = row.get(1)?;
            let value: Option<String> = row.get(2)?;
            if let (Some(key), Some(value)) = (key, value) {
                tags.push((key, value));
            }
        }
        if let Some(previous) = current {
            flush(previous, &mut tags);
        }
    }

    let mut edges_updated = 0usize;
    {
        let mut update = tx.prepare("UPDATE graph_edges SET permit = ?1 WHERE way_id = ?2")?;
        for (way_id, permit) in &assignments {
            edges_updated += update.execute(params![permit.bits(), way_id])?;
        }
    }
    tx.commit()?;

    let report = ClassifyReport {
        rules: rules.len(),
        ways: assignments.len(),
        edges_updated,
        defaulted_ways,
    };
    if report.defaulted_ways > 0 {
        warn!(
            ways = report.defaulted_ways,
            mask = PermitMask::DEFAULT.bits(),
            "ways matched no permit rule; default mask applied"
        );
    }
    info!(
        rules = report.rules,
        ways = report.ways,
        edges = report.edges_updated,
        "permit classification complete"
    );
    Ok(report)
}

/// Fill `graph_permit` with the built-in rules when it is empty.
///
/// Returns the number of rules inserted (0 if rules were already present).
pub fn install_default_permit_rules(store: &mut MapStore) -> Result<usize> {
    let tx = store.connection.transaction()?;
    tx.execute_batch(PERMIT_SCHEMA)?;
    let existing: i64 = tx.query_row("SELECT count(*) FROM graph_permit", [], |row| row.get(0))?;
    if existing > 0 {
        debug!(existing, "permit rules already installed");
        return Ok(0);
    }
    let inserted = insert_rules(&tx, &default_permit_rules())?;
    tx.commit()?;
    info!(rules = inserted, "installed default permit rules");
    Ok(inserted)
}

fn insert_rules(conn: &Connection, rules: &[PermitRule]) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO graph_permit (key, value, set_bit, clear_bit) VALUES (?1, ?2, ?3, ?4)",
    )?;
    for rule in rules {
        stmt.execute(params![rule.key, rule.value, rule.set_bits, rule.clear_bits])?;
    }
    Ok(rules.len())
}

fn load_rules(conn: &Connection) -> Result<Vec<PermitRule>> {
    let mut stmt = conn.prepare("SELECT key, value, set_bit, clear_bit FROM graph_permit")?;
    let rows = stmt.query_map([], |row| {
        Ok(PermitRule::new(
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
        ))
    })?;
    let mut rules = Vec::new();
    for rule in rows {
        rules.push(rule?);
    }
    Ok(rules)
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
            [name],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

const EDGE_SELECT: &str = "
    SELECT e.edge_id, e.way_id, e.start_node_id, e.end_node_id, e.dist, e.permit,
           s.lon, s.lat, d.lon, d.lat
    FROM graph_edges e
    LEFT JOIN nodes s ON s.node_id = e.start_node_id
    LEFT JOIN nodes d ON d.node_id = e.end_node_id
";

type RawEdge = (StoredEdge, Option<(f64, f64)>, Option<(f64, f64)>);

fn raw_edge(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEdge> {
    let start = match (row.get::<_, Option<f64>>(6)?, row.get::<_, Option<f64>>(7)?) {
        (Some(lon), Some(lat)) => Some((lon, lat)),
        _ => None,
    };
    let end = match (row.get::<_, Option<f64>>(8)?, row.get::<_, Option<f64>>(9)?) {
        (Some(lon), Some(lat)) => Some((lon, lat)),
        _ => None,
    };
    let edge = StoredEdge {
        edge_id: row.get(0)?,
        way_id: row.get(1)?,
        start_node_id: row.get(2)?,
        end_node_id: row.get(3)?,
        distance: row.get(4)?,
        permit: PermitMask::from_bits(row.get(5)?),
        start: Coordinate::new(0.0, 0.0),
        end: Coordinate::new(0.0, 0.0),
    };
    Ok((edge, start, end))
}

fn collect_edges(
    rows: impl Iterator<Item = rusqlite::Result<RawEdge>>,
) -> Result<Vec<StoredEdge>> {
    let mut edges = Vec::new();
    for entry in rows {
        let (mut edge, start, end) = entry?;
        let Some((lon, lat)) = start else {
            return Err(Error::malformed(
                edge.way_id,
                edge.start_node_id,
                "edge endpoint has no stored coordinates",
            ));
        };
        edge.start = Coordinate::new(lon, lat);
        let Some((lon, lat)) = end else {
            return Err(Error::malformed(
                edge.way_id,
                edge.end_node_id,
                "edge endpoint has no stored coordinates",
            ));
        };
        edge.end = Coordinate::new(lon, lat);
        edges.push(edge);
    }
    Ok(edges)
}

impl EnvelopeIndex for MapStore {
    fn ways_overlapping(&self, bbox: &BoundingBox) -> Result<Vec<WayId>> {
        self.ensure_graph()?;
        let mut stmt = self.connection.prepare_cached(
            "SELECT way_id FROM rtree_way
             WHERE max_lat >= ?1 AND min_lat <= ?2 AND max_lon >= ?3 AND min_lon <= ?4",
        )?;
        let rows = stmt.query_map(
            params![bbox.min_lat, bbox.max_lat, bbox.min_lon, bbox.max_lon],
            |row| row.get::<_, WayId>(0),
        )?;
        let mut ways = Vec::new();
        for way_id in rows {
            ways.push(way_id?);
        }
        Ok(ways)
    }
}

impl EdgeSource for MapStore {
    fn edges_of_ways(&self, way_ids: &[WayId]) -> Result<Vec<StoredEdge>> {
        self.ensure_graph()?;
        let mut stmt = self
            .connection
            .prepare_cached(&format!("{EDGE_SELECT} WHERE e.way_id = ?1 ORDER BY e.edge_id"))?;
        let mut edges = Vec::new();
        for way_id in way_ids {
            let rows = stmt.query_map([way_id], raw_edge)?;
            edges.extend(collect_edges(rows)?);
        }
        Ok(edges)
    }
}

impl WayGeometry for MapStore {
    fn segment(&self, way_id: WayId, from: NodeId, to: NodeId) -> Result<Vec<PathPoint>> {
        let mut stmt = self.connection.prepare_cached(
            "SELECT wn.node_id, n.lon, n.lat
             FROM way_nodes wn
             JOIN nodes n ON n.node_id = wn.node_id
             WHERE wn.way_id = ?1
             ORDER BY wn.node_order",
        )?;
        let rows = stmt.query_map([way_id], |row| {
            Ok(PathPoint {
                node_id: row.get(0)?,
                lon: row.get(1)?,
                lat: row.get(2)?,
            })
        })?;
        let mut nodes = Vec::new();
        for point in rows {
            nodes.push(point?);
        }
        Ok(slice_between(&nodes, from, to).to_vec())
    }
}

/// Shortest run of points from `from` to the next `to` along the way.
///
/// A way that revisits `from` before reaching `to` starts at the last visit,
/// so loops hanging off a repeated node stay out of the slice.
fn slice_between(nodes: &[PathPoint], from: NodeId, to: NodeId) -> &[PathPoint] {
    let Some(first) = nodes.iter().position(|p| p.node_id == from) else {
        return &[];
    };
    let Some(offset) = nodes[first + 1..].iter().position(|p| p.node_id == to) else {
        return &[];
    };
    let end = first + 1 + offset;
    let start = if from == to {
        first
    } else {
        nodes[..end]
            .iter()
            .rposition(|p| p.node_id == from)
            .unwrap_or(first)
    };
    &nodes[start..=end]
}
