//! The transmission engine: composes sexual-behavior and pathogen hazard
//! layers for a relation and samples the next transmission time as the
//! first arrival of an inhomogeneous Poisson process.
//!
//! All layers are expressed with t = 0 at the current simulation time; the
//! returned transmission times are days from now, or -1 when no
//! transmission will ever happen.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp};

use crate::hazard::{self, Coordinate, Layer};
use crate::params::{Gonorrhea, Hiv, SexualBehavior};
use crate::people::Person;

/// Sentinel for "this transmission never happens".
pub const NO_TRANSMISSION: f64 = -1.0;

/// Rate of unprotected anal intercourse. Constant for now: frequency times
/// the share of intercourse without a condom.
struct SexualBehaviorLayer {
    layer: Layer,
}

impl SexualBehaviorLayer {
    fn new(parameters: &SexualBehavior) -> SexualBehaviorLayer {
        let uai_rate = (1.0 - parameters.condom_use) * parameters.sex_frequency;
        SexualBehaviorLayer {
            layer: vec![Coordinate { x: 0.0, y: uai_rate }],
        }
    }

    fn get(&self) -> Layer {
        self.layer.clone()
    }
}

/// Per-act HIV transmission probability over time. The base profile is the
/// configured infectivity-since-infection steps scaled by the base rate;
/// gonorrhea in either partner multiplies it, and the whole profile is
/// shifted so t = 0 is now rather than the day of infection.
struct HivLayer {
    base_layer: Layer,
    pos_has_gn_multiplier: f64,
    neg_has_gn_multiplier: f64,
}

impl HivLayer {
    fn new(parameters: &Hiv) -> HivLayer {
        let base_layer = parameters
            .infectivity_over_time
            .iter()
            .map(|&(start, multiplier)| Coordinate {
                x: start,
                y: multiplier * parameters.base_rate,
            })
            .collect();
        HivLayer {
            base_layer,
            pos_has_gn_multiplier: parameters.hiv_pos_has_gonorrhea_multiplier,
            neg_has_gn_multiplier: parameters.hiv_neg_has_gonorrhea_multiplier,
        }
    }

    fn get(&self, infected: &Person, susceptible: &Person, simulation_t: i32) -> Layer {
        assert!(infected.hiv.infected, "HIV layer requested for an uninfected source");
        assert!(!susceptible.hiv.infected, "HIV layer requested for an infected target");
        let t_since_infection = infected.hiv.t_since_infection(simulation_t);
        assert!(t_since_infection >= 0, "HIV infection lies in the future");

        let mut layer = self.base_layer.clone();
        let mut multiplier = 1.0;
        if infected.gonorrhea.infected {
            multiplier *= self.pos_has_gn_multiplier;
        }
        if susceptible.gonorrhea.infected {
            multiplier *= self.neg_has_gn_multiplier;
        }
        for point in &mut layer {
            point.y *= multiplier;
        }
        // A person infected 50 days ago is 50 days into the profile: shift
        // it back so t = 0 lines up with today.
        hazard::move_forward(&mut layer, -f64::from(t_since_infection));
        layer
    }
}

/// Per-act gonorrhea transmission probability: constant.
struct GnLayer {
    layer: Layer,
}

impl GnLayer {
    fn new(parameters: &Gonorrhea) -> GnLayer {
        GnLayer {
            layer: vec![Coordinate { x: 0.0, y: parameters.base_rate }],
        }
    }

    fn get(&self, infected: &Person, susceptible: &Person, simulation_t: i32) -> Layer {
        assert!(infected.gonorrhea.infected, "GN layer requested for an uninfected source");
        assert!(!susceptible.gonorrhea.infected, "GN layer requested for an infected target");
        assert!(
            infected.gonorrhea.t_since_infection(simulation_t) >= 0,
            "GN infection lies in the future"
        );
        self.layer.clone()
    }
}

pub struct Transmission {
    sexual_behavior: SexualBehaviorLayer,
    hiv: HivLayer,
    gn: GnLayer,
    rng: SmallRng,
    unit_exponential: Exp<f64>,
}

impl Transmission {
    pub fn new(
        sexual_behavior: &SexualBehavior,
        hiv: &Hiv,
        gonorrhea: &Gonorrhea,
        seed: u64,
    ) -> Transmission {
        Transmission {
            sexual_behavior: SexualBehaviorLayer::new(sexual_behavior),
            hiv: HivLayer::new(hiv),
            gn: GnLayer::new(gonorrhea),
            rng: SmallRng::seed_from_u64(seed),
            unit_exponential: Exp::new(1.0).unwrap(),
        }
    }

    /// Days from now until `susceptible` catches HIV from `infected`, or
    /// [`NO_TRANSMISSION`].
    pub fn hiv_transmission_time(
        &mut self,
        infected: &Person,
        susceptible: &Person,
        simulation_t: i32,
    ) -> f64 {
        let sti_layer = self.hiv.get(infected, susceptible, simulation_t);
        self.transmission_given_sti_layer(sti_layer)
    }

    /// Days from now until `susceptible` catches gonorrhea from `infected`,
    /// or [`NO_TRANSMISSION`].
    pub fn gn_transmission_time(
        &mut self,
        infected: &Person,
        susceptible: &Person,
        simulation_t: i32,
    ) -> f64 {
        let sti_layer = self.gn.get(infected, susceptible, simulation_t);
        self.transmission_given_sti_layer(sti_layer)
    }

    fn transmission_given_sti_layer(&mut self, sti_layer: Layer) -> f64 {
        debug_assert!(hazard::is_valid(&sti_layer));
        let total_layer = hazard::multiply(&[self.sexual_behavior.get(), sti_layer]);
        self.sample_transmission_time(&total_layer)
    }

    /// First arrival of an inhomogeneous Poisson process with the layer as
    /// its intensity: draw a unit exponential budget and walk the steps
    /// left to right, spending rate x width per interval. Coordinates at
    /// x <= 0 only set the current rate.
    pub fn sample_transmission_time(&mut self, layer: &Layer) -> f64 {
        debug_assert!(hazard::is_valid(layer));

        let mut remaining = self.unit_exponential.sample(&mut self.rng);
        let mut t = 0.0;
        let mut rate = layer[0].y;

        for point in layer {
            if point.x <= 0.0 {
                rate = point.y;
                continue;
            }

            let area = (point.x - t) * rate;
            if remaining < area {
                break; // The budget runs out inside this interval.
            }
            remaining -= area;
            t = point.x;
            rate = point.y;
        }

        if rate == 0.0 {
            return NO_TRANSMISSION;
        }
        remaining / rate + t
    }
}
