//! Per-cell and per-edge physical properties.

/// Properties of a single cell, used when building a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellProperties {
    /// Initial water-table elevation (piezometric head)
    pub eta: f64,
    /// Bedrock elevation
    pub bottom_elevation: f64,
    /// Ground surface elevation
    pub top_elevation: f64,
    /// Plan area of the polygon
    pub plan_area: f64,
    /// Source (positive) or sink (negative) rate per unit area
    pub source_sink: f64,
    /// Storage coefficient
    pub storage_coefficient: f64,
    /// Datum elevation for the storage term
    pub datum: f64,
}

impl CellProperties {
    /// A cell with the given head, bedrock and area. Top elevation defaults to
    /// the head, there is no source, and the storage term uses a unit
    /// coefficient over bedrock.
    pub fn new(eta: f64, bottom_elevation: f64, plan_area: f64) -> Self {
        Self {
            eta,
            bottom_elevation,
            top_elevation: eta,
            plan_area,
            source_sink: 0.0,
            storage_coefficient: 1.0,
            datum: bottom_elevation,
        }
    }

    /// Set the ground surface elevation.
    pub fn with_top_elevation(mut self, top_elevation: f64) -> Self {
        self.top_elevation = top_elevation;
        self
    }

    /// Set the source/sink rate.
    pub fn with_source(mut self, source_sink: f64) -> Self {
        self.source_sink = source_sink;
        self
    }

    /// Set the storage coefficient and its datum.
    pub fn with_storage(mut self, storage_coefficient: f64, datum: f64) -> Self {
        self.storage_coefficient = storage_coefficient;
        self.datum = datum;
        self
    }
}

/// Properties of the edge shared by two cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeProperties {
    /// Euclidean distance between the two cell centers
    pub distance: f64,
    /// Saturated hydraulic conductivity across the edge
    pub conductivity: f64,
    /// Length of the edge
    pub length: f64,
}

impl EdgeProperties {
    /// Create edge properties.
    pub fn new(distance: f64, conductivity: f64, length: f64) -> Self {
        Self {
            distance,
            conductivity,
            length,
        }
    }

    /// Geometric conductance factor `conductivity * length / distance`.
    #[inline]
    pub fn conductance_factor(&self) -> f64 {
        (1.0 / self.distance) * self.conductivity * self.length
    }
}

/// Per-cell fields, one entry per cell.
#[derive(Debug, Clone, Default)]
pub struct CellFields {
    pub eta: Vec<f64>,
    pub bottom_elevation: Vec<f64>,
    pub top_elevation: Vec<f64>,
    pub plan_area: Vec<f64>,
    pub source_sink: Vec<f64>,
    pub storage_coefficient: Vec<f64>,
    pub datum: Vec<f64>,
}

impl CellFields {
    /// Create empty fields with room for `n` cells.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            eta: Vec::with_capacity(n),
            bottom_elevation: Vec::with_capacity(n),
            top_elevation: Vec::with_capacity(n),
            plan_area: Vec::with_capacity(n),
            source_sink: Vec::with_capacity(n),
            storage_coefficient: Vec::with_capacity(n),
            datum: Vec::with_capacity(n),
        }
    }

    /// Append one cell.
    pub fn push(&mut self, cell: CellProperties) {
        self.eta.push(cell.eta);
        self.bottom_elevation.push(cell.bottom_elevation);
        self.top_elevation.push(cell.top_elevation);
        self.plan_area.push(cell.plan_area);
        self.source_sink.push(cell.source_sink);
        self.storage_coefficient.push(cell.storage_coefficient);
        self.datum.push(cell.datum);
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.eta.len()
    }

    /// Check if there are no cells.
    pub fn is_empty(&self) -> bool {
        self.eta.is_empty()
    }

    /// Saturated thickness `eta - bottom` of cell `i` for head `eta`.
    #[inline]
    pub fn thickness(&self, i: usize, eta: f64) -> f64 {
        eta - self.bottom_elevation[i]
    }
}

/// Per-edge fields, indexed by [`EdgeId`](super::EdgeId).
#[derive(Debug, Clone, Default)]
pub struct EdgeFields {
    pub distance: Vec<f64>,
    pub conductivity: Vec<f64>,
    pub length: Vec<f64>,
}

impl EdgeFields {
    /// Append one edge.
    pub fn push(&mut self, edge: EdgeProperties) {
        self.distance.push(edge.distance);
        self.conductivity.push(edge.conductivity);
        self.length.push(edge.length);
    }

    /// Number of edges.
    pub fn len(&self) -> usize {
        self.distance.len()
    }

    /// Check if there are no edges.
    pub fn is_empty(&self) -> bool {
        self.distance.is_empty()
    }

    /// Geometric conductance factor of edge `e`.
    #[inline]
    pub fn conductance_factor(&self, e: usize) -> f64 {
        (1.0 / self.distance[e]) * self.conductivity[e] * self.length[e]
    }
}
