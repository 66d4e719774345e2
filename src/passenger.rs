use crate::primitives::Cost;

/// Behavioural parameters of the passengers.
///
/// Subjective values are money per hour; only their ratios to the in-vehicle
/// value enter the generalized cost, which is measured in in-vehicle hours.
#[derive(Debug, Clone, PartialEq)]
pub struct Passenger {
    /// km/h
    pub walking_speed: f64,
    pub in_vehicle_value: f64,
    pub waiting_value: f64,
    pub access_value: f64,
    pub transfer_value: f64,
    /// Fixed time lost per alighting, in hours.
    pub transfer_time: f64,
}

impl Passenger {
    pub fn access_factor(&self) -> f64 {
        self.access_value / self.in_vehicle_value
    }

    pub fn wait_factor(&self) -> f64 {
        self.waiting_value / self.in_vehicle_value
    }

    pub fn transfer_penalty(&self) -> Cost {
        self.transfer_time * self.transfer_value / self.in_vehicle_value
    }

    /// Generalized cost of walking `distance` km.
    pub fn walking_cost(&self, distance: f64) -> Cost {
        distance / self.walking_speed * self.access_factor()
    }

    /// Inverse of [`Passenger::walking_cost`].
    pub fn indifference_distance(&self, cost_difference: Cost) -> f64 {
        self.walking_speed * cost_difference / self.access_factor()
    }
}

impl Default for Passenger {
    fn default() -> Self {
        Self {
            walking_speed: 4.0,
            in_vehicle_value: 1.0,
            waiting_value: 1.0,
            access_value: 1.0,
            transfer_value: 1.0,
            transfer_time: 0.0,
        }
    }
}
