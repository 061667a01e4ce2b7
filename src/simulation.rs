//! The control room: populate, seed the epidemics, then drive the day x
//! priority double loop and report once per simulated year.

use log::info;

use crate::demography;
use crate::error::StinetError;
use crate::event::{Event, EventKind, Priority};
use crate::infection;
use crate::params::ParameterPack;
use crate::people::{Person, PersonId};
use crate::report::{self, ReportSink};
use crate::state::State;

pub struct Simulation {
    state: State,
}

impl Simulation {
    pub fn new(params: ParameterPack, seed: u32) -> Simulation {
        Simulation {
            state: State::new(params, seed),
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Creates the population, seeds the configured number of HIV and
    /// gonorrhea infections and installs the two daily driver events.
    pub fn start(&mut self) {
        demography::populate(&mut self.state);

        let n_hiv = self.state.params.hiv.initial_seeded as usize;
        let n_gn = self.state.params.gonorrhea.initial_seeded as usize;
        assert!(
            n_hiv + n_gn <= self.state.people.len(),
            "seeding more infections than the population holds"
        );
        let ids: Vec<PersonId> = self.state.people.iter().map(Person::id).collect();
        for &id in ids.iter().take(n_hiv) {
            infection::hiv_infect_person(&mut self.state, id);
        }
        for &id in ids.iter().skip(n_hiv).take(n_gn) {
            infection::gn_infect_person(&mut self.state, id);
        }

        self.state.schedule(Event::new(0, EventKind::Births));
        self.state.schedule(Event::new(0, EventKind::Matchmaking));

        info!(
            "started: population {}, {} HIV / {} GN seeded, master seed {}",
            self.state.people.len(),
            n_hiv,
            n_gn,
            self.state.seed_generator.seed()
        );
    }

    /// Runs one simulated day: every priority class in order, with the
    /// state's clock and current-priority marker set around each batch.
    pub fn step_day(&mut self, day: i32) {
        for priority in Priority::ALL {
            self.state.time = day;
            self.state.current_priority = priority;
            self.state.execute_all(day, priority);
        }
    }

    /// Runs the simulation for `n_days`, emitting the matchmaker and
    /// export reports every 365 days.
    pub fn run(&mut self, n_days: i32, reports: &mut ReportSink) -> Result<(), StinetError> {
        self.start();
        for day in 0..n_days {
            self.step_day(day);
            if day % 365 == 0 {
                reports.write_summary(&self.state.matchmaker.log_report())?;
                report::export_results(&self.state, reports)?;
            }
        }
        info!("finished after {n_days} days");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_params(population: u32) -> ParameterPack {
        let mut params = ParameterPack::default();
        params.demographics.initial_population = population;
        params.relation_generation_start.stat_process_n_prearrivals = 10_000;
        params.hiv.initial_seeded = 0;
        params.gonorrhea.initial_seeded = 0;
        params
    }

    #[test]
    fn start_seeds_the_configured_infections() {
        let mut params = quick_params(50);
        params.hiv.initial_seeded = 5;
        params.gonorrhea.initial_seeded = 7;
        let mut simulation = Simulation::new(params, 1);
        simulation.start();

        let state = simulation.state();
        let hiv = state.people.iter().filter(|p| p.hiv.infected).count();
        let gn = state.people.iter().filter(|p| p.gonorrhea.infected).count();
        assert_eq!(hiv, 5);
        assert_eq!(gn, 7);
    }

    #[test]
    #[should_panic(expected = "more infections than the population")]
    fn overseeding_is_rejected() {
        let mut params = quick_params(10);
        params.hiv.initial_seeded = 8;
        params.gonorrhea.initial_seeded = 8;
        Simulation::new(params, 1).start();
    }

    #[test]
    fn population_stays_at_target_across_days() {
        let mut simulation = Simulation::new(quick_params(60), 2);
        simulation.start();
        for day in 0..200 {
            simulation.step_day(day);
            assert_eq!(
                simulation.state().people.len(),
                60,
                "population off target on day {day}"
            );
        }
    }

    #[test]
    fn relations_form_within_a_few_weeks() {
        let mut simulation = Simulation::new(quick_params(200), 3);
        simulation.start();
        let mut total_relations = 0;
        for day in 0..60 {
            simulation.step_day(day);
            total_relations += simulation.state().relations.len();
        }
        assert!(total_relations > 0, "no relations formed in 60 days");
    }
}
