//! Doc29 noise records and per-segment noise generators.
//!
//! A [`Doc29Noise`] record carries the certification data of an aircraft
//! type: NPD tables and reference spectra for arrivals and departures plus
//! the directivity selectors. Generators copy the tables at run start, fold
//! the run's atmospheric absorption into them and evaluate the per-segment
//! (LAmax, SEL) closed form: NPD interpolation at the three characteristic
//! slant distances, then duration, engine installation, lateral attenuation,
//! finite segment and start-of-roll corrections.

use std::f64::consts::{FRAC_1_PI, PI};

use crate::coord::{CoordinateSystem, Intersection};
use crate::noise::absorption::{
    AtmosphericAbsorption, Spectrum, A_WEIGHTS, BAND_COUNT, NPD_AVERAGE_ATTENUATION_RATES,
};
use crate::noise::npd::{NoiseLevels, NpdData, NPD_DISTANCE_COUNT, NPD_STANDARD_DISTANCES};
use crate::noise::Receptor;
use crate::operation::{FlightPhase, ProfilePoint};
use crate::units::from_knots;
use crate::PRECISION;

/// Spectrum reference distance, m (1000 ft).
const REFERENCE_DISTANCE: f64 = 305.0;

/// NPD reference speed of 160 kt in m/s.
fn reference_speed() -> f64 {
    from_knots(160.0)
}

/// Engine mounting driving the lateral directivity correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LateralDirectivity {
    Wing,
    Fuselage,
    Propeller,
}

/// Start-of-roll directivity applied behind the takeoff roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SorCorrection {
    None,
    Jet,
    Turboprop,
}

/// Noise certification data of an aircraft type.
#[derive(Debug, Clone)]
pub struct Doc29Noise {
    pub name: String,
    pub lateral_directivity: LateralDirectivity,
    pub start_of_roll_correction: SorCorrection,
    pub arrival_spectrum: Spectrum,
    pub departure_spectrum: Spectrum,
    pub arrival_lamax: NpdData,
    pub arrival_sel: NpdData,
    pub departure_lamax: NpdData,
    pub departure_sel: NpdData,
}

impl Doc29Noise {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lateral_directivity: LateralDirectivity::Wing,
            start_of_roll_correction: SorCorrection::Jet,
            arrival_spectrum: Spectrum::default(),
            departure_spectrum: Spectrum::default(),
            arrival_lamax: NpdData::new(),
            arrival_sel: NpdData::new(),
            departure_lamax: NpdData::new(),
            departure_sel: NpdData::new(),
        }
    }

    /// Both arrival tables have the two rows interpolation needs.
    pub fn valid_arrivals(&self) -> bool {
        self.arrival_lamax.valid() && self.arrival_sel.valid()
    }

    /// Both departure tables have the two rows interpolation needs.
    pub fn valid_departures(&self) -> bool {
        self.departure_lamax.valid() && self.departure_sel.valid()
    }

    pub fn valid(&self) -> bool {
        self.valid_arrivals() && self.valid_departures()
    }
}

/// Everything a generator needs to evaluate one segment at one receptor.
pub struct SegmentContext<'a> {
    /// Segment length along the flight path, m.
    pub length: f64,
    /// Climb angle of the segment, radians.
    pub angle: f64,
    /// Aircraft-level adjustment added to every NPD lookup, dB.
    pub delta: f64,
    pub start: &'a ProfilePoint,
    pub end: &'a ProfilePoint,
    pub receptor: &'a Receptor,
    pub coordinate_system: &'a CoordinateSystem,
    /// Segments whose closest endpoint lies farther than this contribute
    /// nothing, m.
    pub maximum_distance: f64,
}

/// Shared state of the arrival and departure generators: working copies of
/// the NPD tables with the current absorption deltas folded in.
#[derive(Debug, Clone)]
struct GeneratorCore {
    sel: NpdData,
    lamax: NpdData,
    spectrum: Spectrum,
    lateral_directivity: LateralDirectivity,
    deltas: NoiseLevels,
}

impl GeneratorCore {
    fn new(sel: NpdData, lamax: NpdData, spectrum: Spectrum, lateral_directivity: LateralDirectivity) -> Self {
        Self {
            sel,
            lamax,
            spectrum,
            lateral_directivity,
            deltas: [0.0; NPD_DISTANCE_COUNT],
        }
    }

    fn apply_atmospheric_absorption(&mut self, absorption: &AtmosphericAbsorption) {
        self.reset_atmospheric_absorption();
        if let Some(rates) = absorption.rates() {
            self.deltas = absorption_deltas(&self.spectrum, rates);
            self.sel.apply_delta(&self.deltas);
            self.lamax.apply_delta(&self.deltas);
        }
    }

    fn reset_atmospheric_absorption(&mut self) {
        let negated = self.deltas.map(|delta| -delta);
        self.sel.apply_delta(&negated);
        self.lamax.apply_delta(&negated);
        self.deltas = [0.0; NPD_DISTANCE_COUNT];
    }
}

/// Per-distance deltas between the specified absorption and the NPD
/// reference atmosphere, derived from the aircraft spectrum.
fn absorption_deltas(spectrum: &Spectrum, rates: &[f64; BAND_COUNT]) -> NoiseLevels {
    // Back out the source spectrum from the reference distance
    let mut corrected = [0.0; BAND_COUNT];
    for (band, corrected_level) in corrected.iter_mut().enumerate() {
        *corrected_level =
            spectrum.levels()[band] + NPD_AVERAGE_ATTENUATION_RATES[band] * REFERENCE_DISTANCE;
    }

    let banded_level = |distance: f64, attenuation: &[f64; BAND_COUNT], band: usize| {
        corrected[band] - 20.0 * (distance / REFERENCE_DISTANCE).log10() - attenuation[band] * distance
            + A_WEIGHTS[band]
    };

    let mut deltas = [0.0; NPD_DISTANCE_COUNT];
    for (i, delta) in deltas.iter_mut().enumerate() {
        let distance = NPD_STANDARD_DISTANCES[i];
        let mut specified = 0.0;
        let mut standard = 0.0;
        for band in 0..BAND_COUNT {
            specified += 10f64.powf(banded_level(distance, rates, band) / 10.0);
            standard +=
                10f64.powf(banded_level(distance, &NPD_AVERAGE_ATTENUATION_RATES, band) / 10.0);
        }
        *delta = 10.0 * specified.log10() - 10.0 * standard.log10();
    }
    deltas
}

/// Evaluates arrival segments against the arrival NPD tables.
#[derive(Debug, Clone)]
pub struct Doc29ArrivalGenerator {
    core: GeneratorCore,
}

impl Doc29ArrivalGenerator {
    pub fn new(record: &Doc29Noise) -> Self {
        Self {
            core: GeneratorCore::new(
                record.arrival_sel.clone(),
                record.arrival_lamax.clone(),
                record.arrival_spectrum,
                record.lateral_directivity,
            ),
        }
    }

    pub fn apply_atmospheric_absorption(&mut self, absorption: &AtmosphericAbsorption) {
        self.core.apply_atmospheric_absorption(absorption);
    }

    /// Current per-distance absorption deltas, dB.
    pub fn deltas(&self) -> &NoiseLevels {
        &self.core.deltas
    }

    /// (LAmax, SEL) contribution of one segment, or `None` when the segment
    /// is farther than the run's maximum distance.
    pub fn noise(&self, ctx: &SegmentContext<'_>) -> Option<(f64, f64)> {
        let geometry = segment_geometry(ctx)?;

        let sel_seg = self.core.sel.interpolate(geometry.thrust, geometry.distance_e) + ctx.delta;
        let lamax_seg = self.core.lamax.interpolate(geometry.thrust, geometry.distance_s) + ctx.delta;
        let lamax_p = self.core.lamax.interpolate(geometry.thrust, geometry.distance_p) + ctx.delta;

        let corrections = common_corrections(&geometry, self.core.lateral_directivity);

        let dist_scaled = 2.0 * FRAC_1_PI * reference_speed() * 10f64.powf((sel_seg - lamax_p) / 10.0);
        let finite_segment = if geometry.behind_roll {
            let alpha1 = -ctx.length / dist_scaled;
            10.0 * (FRAC_1_PI * (-alpha1 / (1.0 + alpha1 * alpha1) - alpha1.atan())).log10()
        } else {
            let alpha1 = -geometry.q / dist_scaled;
            let alpha2 = -(geometry.q - ctx.length) / dist_scaled;
            10.0 * (FRAC_1_PI
                * (alpha2 / (1.0 + alpha2 * alpha2) + alpha2.atan()
                    - alpha1 / (1.0 + alpha1 * alpha1)
                    - alpha1.atan()))
            .log10()
        }
        .max(-150.0);

        let lamax = lamax_seg + corrections.engine_installation_maximum
            - corrections.lateral_attenuation_maximum;
        let sel = sel_seg
            + corrections.duration
            + corrections.engine_installation_exposure
            - corrections.lateral_attenuation_exposure
            + finite_segment;

        Some((lamax, sel))
    }
}

/// Evaluates departure segments, adding the start-of-roll directivity.
#[derive(Debug, Clone)]
pub struct Doc29DepartureGenerator {
    core: GeneratorCore,
    start_of_roll: SorCorrection,
}

impl Doc29DepartureGenerator {
    pub fn new(record: &Doc29Noise) -> Self {
        Self {
            core: GeneratorCore::new(
                record.departure_sel.clone(),
                record.departure_lamax.clone(),
                record.departure_spectrum,
                record.lateral_directivity,
            ),
            start_of_roll: record.start_of_roll_correction,
        }
    }

    pub fn apply_atmospheric_absorption(&mut self, absorption: &AtmosphericAbsorption) {
        self.core.apply_atmospheric_absorption(absorption);
    }

    pub fn deltas(&self) -> &NoiseLevels {
        &self.core.deltas
    }

    /// (LAmax, SEL) contribution of one segment, or `None` when the segment
    /// is farther than the run's maximum distance.
    pub fn noise(&self, ctx: &SegmentContext<'_>) -> Option<(f64, f64)> {
        let geometry = segment_geometry(ctx)?;

        let sel_seg = self.core.sel.interpolate(geometry.thrust, geometry.distance_e) + ctx.delta;
        let lamax_seg = self.core.lamax.interpolate(geometry.thrust, geometry.distance_s) + ctx.delta;
        let lamax_p = self.core.lamax.interpolate(geometry.thrust, geometry.distance_p) + ctx.delta;

        let corrections = common_corrections(&geometry, self.core.lateral_directivity);

        let dist_scaled = 2.0 * FRAC_1_PI * reference_speed() * 10f64.powf((sel_seg - lamax_p) / 10.0);
        let finite_segment = if geometry.behind_roll {
            let alpha2 = ctx.length / dist_scaled;
            10.0 * (FRAC_1_PI * (alpha2 / (1.0 + alpha2 * alpha2) + alpha2.atan())).log10()
        } else {
            let alpha1 = -geometry.q / dist_scaled;
            let alpha2 = -(geometry.q - ctx.length) / dist_scaled;
            10.0 * (FRAC_1_PI
                * (alpha2 / (1.0 + alpha2 * alpha2) + alpha2.atan()
                    - alpha1 / (1.0 + alpha1 * alpha1)
                    - alpha1.atan()))
            .log10()
        }
        .max(-150.0);

        let mut start_of_roll = 0.0;
        if geometry.behind_roll {
            let ratio = geometry.q / geometry.distance_s;
            let azimuth = if ratio.is_nan() || ratio + 1.0 < PRECISION {
                180.0
            } else {
                ratio.acos().to_degrees()
            };
            start_of_roll = match self.start_of_roll {
                SorCorrection::None => 0.0,
                SorCorrection::Jet => sor_correction_jet(azimuth),
                SorCorrection::Turboprop => sor_correction_turboprop(azimuth),
            };
            // Directivity tapers off beyond 762 m from the start of roll
            if geometry.distance_s > 762.0 {
                start_of_roll = start_of_roll * 762.0 / geometry.distance_s;
            }
        }

        let lamax = lamax_seg + corrections.engine_installation_maximum
            - corrections.lateral_attenuation_maximum
            + start_of_roll;
        let sel = sel_seg
            + corrections.duration
            + corrections.engine_installation_exposure
            - corrections.lateral_attenuation_exposure
            + finite_segment
            + start_of_roll;

        Some((lamax, sel))
    }
}

/// Geometry of one segment as seen from one receptor. P is the perpendicular
/// point, S the closest segment point, E the exposure reference point.
struct SegmentGeometry {
    q: f64,
    distance_p: f64,
    ground_distance_s: f64,
    distance_s: f64,
    elevation_angle_s: f64,
    depression_angle_s: f64,
    ground_distance_e: f64,
    distance_e: f64,
    elevation_angle_e: f64,
    depression_angle_e: f64,
    true_airspeed: f64,
    thrust: f64,
    behind_roll: bool,
}

fn lerp(a: f64, b: f64, factor: f64) -> f64 {
    a + (b - a) * factor
}

fn segment_geometry(ctx: &SegmentContext<'_>) -> Option<SegmentGeometry> {
    let cs = ctx.coordinate_system;
    let receptor = ctx.receptor;

    let distance1 = cs.distance(receptor.position, ctx.start.position);
    let distance2 = cs.distance(receptor.position, ctx.end.position);
    if distance1.min(distance2) > ctx.maximum_distance {
        return None;
    }

    let (foot, location) = cs.intersection(ctx.start.position, ctx.end.position, receptor.position);
    let ground_distance_p = cs.distance(receptor.position, foot);
    let ground_length_q = cs.distance(ctx.start.position, foot);
    let angle = ctx.angle;

    let roll_segment =
        ctx.end.phase == FlightPhase::TakeoffRoll || ctx.start.phase == FlightPhase::LandingRoll;

    let q;
    let mut distance_p;
    let ground_distance_s;
    let distance_s;
    let elevation_angle_s;
    let mut elevation_angle_e;
    let ground_distance_e;
    let distance_e;
    let true_airspeed;
    let thrust;
    let bank_angle;
    let behind_roll;

    match location {
        Intersection::Behind => {
            q = -ground_length_q / angle.cos();

            let altitude_p = ctx.start.altitude_msl - ground_length_q * angle.tan();
            let altitude_diff_p = altitude_p - receptor.elevation;
            let altitude_diff_1 = ctx.start.altitude_msl - receptor.elevation;

            ground_distance_s = distance1;
            distance_p = ground_distance_p.hypot(altitude_diff_p);
            distance_s = ground_distance_s.hypot(altitude_diff_1);

            if altitude_diff_1 < PRECISION {
                elevation_angle_s = 0.0;
                elevation_angle_e = 0.0;
            } else {
                elevation_angle_s = (altitude_diff_1 / ground_distance_s).atan();
                elevation_angle_e = (altitude_diff_1 / angle.cos() / ground_distance_p).atan();
            }

            if ctx.end.phase == FlightPhase::TakeoffRoll {
                // Receptor behind the takeoff roll
                distance_p = distance_s;
                ground_distance_e = ground_distance_s;
                distance_e = distance_s;
                elevation_angle_e = elevation_angle_s;
                behind_roll = true;
            } else {
                ground_distance_e = ground_distance_p;
                distance_e = distance_p;
                behind_roll = false;
            }

            true_airspeed = if roll_segment {
                (ctx.start.true_airspeed + ctx.end.true_airspeed) / 2.0
            } else {
                ctx.start.true_airspeed
            };
            thrust = ctx.start.corrected_net_thrust_per_engine;
            bank_angle = ctx.start.bank_angle;
        }
        Intersection::Between => {
            q = ground_length_q / angle.cos();

            let altitude_p = ctx.start.altitude_msl + ground_length_q * angle.tan();
            let altitude_diff_p = altitude_p - receptor.elevation;

            ground_distance_s = ground_distance_p;
            distance_p = ground_distance_p.hypot(altitude_diff_p);
            distance_s = distance_p;

            if altitude_diff_p < PRECISION {
                elevation_angle_s = 0.0;
            } else {
                elevation_angle_s = (altitude_diff_p / ground_distance_p).atan();
            }
            elevation_angle_e = elevation_angle_s;

            ground_distance_e = ground_distance_s;
            distance_e = distance_p;

            let factor = q / ctx.length;
            true_airspeed = if roll_segment {
                (ctx.start.true_airspeed + ctx.end.true_airspeed) / 2.0
            } else {
                lerp(ctx.start.true_airspeed, ctx.end.true_airspeed, factor)
            };
            thrust = lerp(
                ctx.start.corrected_net_thrust_per_engine,
                ctx.end.corrected_net_thrust_per_engine,
                factor,
            );
            bank_angle = lerp(ctx.start.bank_angle, ctx.end.bank_angle, factor);
            behind_roll = false;
        }
        Intersection::Ahead => {
            q = ground_length_q / angle.cos();

            let altitude_p = ctx.start.altitude_msl + ground_length_q * angle.tan();
            let altitude_diff_p = altitude_p - receptor.elevation;
            let altitude_diff_2 = ctx.end.altitude_msl - receptor.elevation;

            ground_distance_s = distance2;
            distance_p = ground_distance_p.hypot(altitude_diff_p);
            distance_s = ground_distance_s.hypot(altitude_diff_2);

            if altitude_diff_2 < PRECISION {
                elevation_angle_s = 0.0;
                elevation_angle_e = 0.0;
            } else {
                elevation_angle_s = (altitude_diff_2 / ground_distance_s).atan();
                elevation_angle_e = (altitude_diff_2 / angle.cos() / ground_distance_p).atan();
            }

            if ctx.start.phase == FlightPhase::LandingRoll {
                // Receptor ahead of the landing roll
                distance_p = distance_s;
                ground_distance_e = ground_distance_s;
                distance_e = distance_s;
                elevation_angle_e = elevation_angle_s;
                behind_roll = true;
            } else {
                ground_distance_e = ground_distance_p;
                distance_e = distance_p;
                behind_roll = false;
            }

            true_airspeed = if roll_segment {
                (ctx.start.true_airspeed + ctx.end.true_airspeed) / 2.0
            } else {
                ctx.end.true_airspeed
            };
            thrust = ctx.end.corrected_net_thrust_per_engine;
            bank_angle = ctx.end.bank_angle;
        }
    }

    // Sign the bank angle by which side of the track the receptor is on
    let bank_multiplier =
        -cs.turn_direction(ctx.start.position, ctx.end.position, receptor.position);
    let depression_angle_s = elevation_angle_s + bank_multiplier * bank_angle;
    let depression_angle_e = elevation_angle_e + bank_multiplier * bank_angle;

    Some(SegmentGeometry {
        q,
        distance_p,
        ground_distance_s,
        distance_s,
        elevation_angle_s,
        depression_angle_s,
        ground_distance_e,
        distance_e,
        elevation_angle_e,
        depression_angle_e,
        true_airspeed,
        thrust,
        behind_roll,
    })
}

struct CommonCorrections {
    duration: f64,
    engine_installation_maximum: f64,
    engine_installation_exposure: f64,
    lateral_attenuation_maximum: f64,
    lateral_attenuation_exposure: f64,
}

fn common_corrections(geometry: &SegmentGeometry, directivity: LateralDirectivity) -> CommonCorrections {
    let duration = if geometry.true_airspeed < PRECISION {
        0.0
    } else {
        10.0 * (reference_speed() / geometry.true_airspeed).log10()
    };

    let (engine_installation_maximum, engine_installation_exposure) = match directivity {
        LateralDirectivity::Wing => (
            engine_installation_correction(0.0039, 0.062, 0.8786, geometry.depression_angle_s),
            engine_installation_correction(0.0039, 0.062, 0.8786, geometry.depression_angle_e),
        ),
        LateralDirectivity::Fuselage => (
            engine_installation_correction(0.1225, 0.329, 1.0, geometry.depression_angle_s),
            engine_installation_correction(0.1225, 0.329, 1.0, geometry.depression_angle_e),
        ),
        LateralDirectivity::Propeller => (0.0, 0.0),
    };

    CommonCorrections {
        duration,
        engine_installation_maximum,
        engine_installation_exposure,
        lateral_attenuation_maximum: lateral_attenuation(
            geometry.ground_distance_s,
            geometry.elevation_angle_s,
        ),
        lateral_attenuation_exposure: lateral_attenuation(
            geometry.ground_distance_e,
            geometry.elevation_angle_e,
        ),
    }
}

fn engine_installation_correction(a: f64, b: f64, c: f64, depression_angle: f64) -> f64 {
    10.0 * ((a * depression_angle.cos().powi(2) + depression_angle.sin().powi(2)).powf(b)
        / (c * (2.0 * depression_angle).sin().powi(2) + (2.0 * depression_angle).cos().powi(2)))
    .log10()
}

fn lateral_attenuation_distance_factor(lateral_displacement: f64) -> f64 {
    if lateral_displacement > 914.0 {
        1.0
    } else {
        1.089 * (1.0 - (-0.00274 * lateral_displacement).exp())
    }
}

fn lateral_attenuation(lateral_displacement: f64, elevation_angle: f64) -> f64 {
    let degrees = elevation_angle.to_degrees();
    if degrees >= 50.0 {
        return 0.0;
    }
    if elevation_angle >= 0.0 {
        (1.137 - 0.0229 * degrees + 9.72 * (-0.142 * degrees).exp())
            * lateral_attenuation_distance_factor(lateral_displacement)
    } else {
        10.857 * lateral_attenuation_distance_factor(lateral_displacement)
    }
}

fn sor_correction_jet(azimuth: f64) -> f64 {
    let azimuth_rad = azimuth * PI / 180.0;
    2329.44 - 8.0573 * azimuth + 11.51 * azimuth_rad.exp()
        - 3.4601 * azimuth / azimuth_rad.ln()
        - 17403383.3 * azimuth_rad.ln() / azimuth.powi(2)
}

fn sor_correction_turboprop(azimuth: f64) -> f64 {
    -34643.898 + 30722161.987 / azimuth - 11491573930.510 / azimuth.powi(2)
        + 2349285669062.0 / azimuth.powi(3)
        - 283584441904272.0 / azimuth.powi(4)
        + 20227150391251300.0 / azimuth.powi(5)
        - 790084471305203000.0 / azimuth.powi(6)
        + 13050687178273800000.0 / azimuth.powi(7)
}
