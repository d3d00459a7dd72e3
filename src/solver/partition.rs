use rayon::prelude::*;

use crate::domain::lattice::Populations;

/// Number of worker bands used when none is requested.
pub fn default_workers() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Contiguous lattice rows `y0..y1` owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub y0: usize,
    pub y1: usize,
}

impl Band {
    pub fn rows(&self) -> usize {
        self.y1 - self.y0
    }
}

/// Splits `ny` rows into at most `workers` bands whose heights differ by at most one.
pub fn partition_rows(ny: usize, workers: usize) -> Vec<Band> {
    let count = workers.clamp(1, ny.max(1));
    let base = ny / count;
    let extra = ny % count;
    let mut bands = Vec::with_capacity(count);
    let mut y0 = 0;
    for k in 0..count {
        let rows = base + usize::from(k < extra);
        bands.push(Band { y0, y1: y0 + rows });
        y0 += rows;
    }
    bands
}

/// Mutable per-band views of a row-contiguous buffer.
pub fn split_bands_mut<'a, T>(buffer: &'a mut [T], bands: &[Band], nx: usize) -> Vec<&'a mut [T]> {
    let mut views = Vec::with_capacity(bands.len());
    let mut rest = buffer;
    for band in bands {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(band.rows() * nx);
        views.push(head);
        rest = tail;
    }
    views
}

/// Read-only per-band views of a row-contiguous buffer.
pub fn split_bands<'a, T>(buffer: &'a [T], bands: &[Band], nx: usize) -> Vec<&'a [T]> {
    let mut views = Vec::with_capacity(bands.len());
    let mut rest = buffer;
    for band in bands {
        let (head, tail) = rest.split_at(band.rows() * nx);
        views.push(head);
        rest = tail;
    }
    views
}

/// Ghost rows copied from the neighbouring bands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Halo {
    pub below: Option<Vec<Populations>>,
    pub above: Option<Vec<Populations>>,
}

/// Copies, for every band, the row just below and just above it.
/// Domain edges get `None`.
pub fn exchange_halos(buffer: &[Populations], bands: &[Band], nx: usize, ny: usize) -> Vec<Halo> {
    let row = |y: usize| buffer[y * nx..(y + 1) * nx].to_vec();
    bands
        .par_iter()
        .map(|band| Halo {
            below: (band.y0 > 0).then(|| row(band.y0 - 1)),
            above: (band.y1 < ny).then(|| row(band.y1)),
        })
        .collect()
}

/// One band's post-collision rows plus its halo, addressed in global coordinates.
#[derive(Debug, Clone, Copy)]
pub struct BandView<'a> {
    pub band: Band,
    pub nx: usize,
    pub cells: &'a [Populations],
    pub below: Option<&'a [Populations]>,
    pub above: Option<&'a [Populations]>,
}

impl<'a> BandView<'a> {
    pub fn new(band: Band, nx: usize, cells: &'a [Populations], halo: &'a Halo) -> Self {
        Self {
            band,
            nx,
            cells,
            below: halo.below.as_deref(),
            above: halo.above.as_deref(),
        }
    }

    /// Node `(x, y)` if it lies in the band or one of its ghost rows.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a Populations> {
        if x >= self.nx {
            return None;
        }
        if y >= self.band.y0 && y < self.band.y1 {
            self.cells.get(x + (y - self.band.y0) * self.nx)
        } else if y + 1 == self.band.y0 {
            self.below.and_then(|row| row.get(x))
        } else if y == self.band.y1 {
            self.above.and_then(|row| row.get(x))
        } else {
            None
        }
    }
}
