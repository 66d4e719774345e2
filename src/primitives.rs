/// Generalized cost in hours of in-vehicle-equivalent time.
pub type Cost = f64;

/// Vehicles per hour.
pub type Frequency = f64;

/// Passengers, either per hour or per vehicle trip.
pub type FVal = f64;

pub const EPS: f64 = 1e-9;
