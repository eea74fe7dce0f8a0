use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of landmarks produced by the pose estimator for one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Thumb tip must sit this far left of the IP joint (mirrored view).
const THUMB_MARGIN: f32 = 0.02;
/// Finger tip may sit at most this far below the reference joint.
const FINGER_MARGIN: f32 = 0.03;

/// Landmark indices in the 21-point hand model.
pub mod landmark {
    pub const WRIST: usize = 0;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_PIP: usize = 14;
    pub const RING_TIP: usize = 16;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_TIP: usize = 20;
}

/// (tip, reference joint) for index, middle, ring and pinky.
const FINGER_JOINTS: [(usize, usize); 4] = [
    (landmark::INDEX_TIP, landmark::INDEX_PIP),
    (landmark::MIDDLE_TIP, landmark::MIDDLE_PIP),
    (landmark::RING_TIP, landmark::RING_PIP),
    (landmark::PINKY_TIP, landmark::PINKY_PIP),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<[f32; 3]> for Landmark {
    fn from(value: [f32; 3]) -> Self {
        Self::new(value[0], value[1], value[2])
    }
}

/// One detected hand: 21 points in normalized image space.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    pub fn new(points: [Landmark; LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    pub fn point(&self, idx: usize) -> Landmark {
        self.points[idx]
    }

    pub fn set_point(&mut self, idx: usize, point: Landmark) {
        self.points[idx] = point;
    }
}

impl TryFrom<Vec<[f32; 3]>> for HandLandmarks {
    type Error = anyhow::Error;

    fn try_from(value: Vec<[f32; 3]>) -> Result<Self, Self::Error> {
        if value.len() != LANDMARK_COUNT {
            anyhow::bail!(
                "expected {LANDMARK_COUNT} landmarks, got {}",
                value.len()
            );
        }
        let mut points = [Landmark::default(); LANDMARK_COUNT];
        for (slot, raw) in points.iter_mut().zip(value) {
            *slot = Landmark::from(raw);
        }
        Ok(Self { points })
    }
}

/// Extended flags in finger order: thumb, index, middle, ring, pinky.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FingerState(pub [bool; 5]);

impl FingerState {
    pub fn signature(&self) -> GestureSignature {
        let code = self.0.iter().map(|up| if *up { '1' } else { '0' }).collect();
        GestureSignature(code)
    }

    pub fn extended_count(&self) -> usize {
        self.0.iter().filter(|up| **up).count()
    }
}

/// Classify each finger as extended or flexed.
pub fn finger_state(hand: &HandLandmarks) -> FingerState {
    let mut fingers = [false; 5];
    let thumb_tip = hand.point(landmark::THUMB_TIP);
    let thumb_ip = hand.point(landmark::THUMB_IP);
    fingers[0] = thumb_tip.x < thumb_ip.x - THUMB_MARGIN;
    for (slot, (tip, joint)) in fingers[1..].iter_mut().zip(FINGER_JOINTS) {
        *slot = hand.point(tip).y < hand.point(joint).y + FINGER_MARGIN;
    }
    FingerState(fingers)
}

/// Canonical signature for a detected hand.
pub fn extract(hand: &HandLandmarks) -> GestureSignature {
    finger_state(hand).signature()
}

/// Five-character `0`/`1` code, one character per finger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GestureSignature(String);

impl GestureSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn finger_state(&self) -> FingerState {
        let mut fingers = [false; 5];
        for (slot, ch) in fingers.iter_mut().zip(self.0.chars()) {
            *slot = ch == '1';
        }
        FingerState(fingers)
    }
}

impl fmt::Display for GestureSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid gesture signature '{0}': expected 5 characters of 0/1")]
pub struct InvalidSignature(pub String);

impl FromStr for GestureSignature {
    type Err = InvalidSignature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 5 && s.bytes().all(|b| b == b'0' || b == b'1') {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidSignature(s.to_string()))
        }
    }
}

impl TryFrom<String> for GestureSignature {
    type Error = InvalidSignature;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GestureSignature> for String {
    fn from(value: GestureSignature) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Open hand with every tip comfortably past its joint.
    fn open_hand() -> HandLandmarks {
        let mut points = [Landmark::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        points[landmark::THUMB_IP] = Landmark::new(0.40, 0.50, 0.0);
        points[landmark::THUMB_TIP] = Landmark::new(0.30, 0.50, 0.0);
        for (tip, joint) in FINGER_JOINTS {
            points[joint] = Landmark::new(0.5, 0.50, 0.0);
            points[tip] = Landmark::new(0.5, 0.30, 0.0);
        }
        HandLandmarks::new(points)
    }

    #[test]
    fn open_hand_is_all_ones() {
        assert_eq!(extract(&open_hand()).as_str(), "11111");
    }

    #[test]
    fn thumb_boundary_at_margin() {
        let mut hand = open_hand();
        let ip = hand.point(landmark::THUMB_IP);
        hand.set_point(landmark::THUMB_TIP, Landmark::new(ip.x - 0.05, ip.y, 0.0));
        assert!(finger_state(&hand).0[0]);
        hand.set_point(landmark::THUMB_TIP, Landmark::new(ip.x - 0.01, ip.y, 0.0));
        assert!(!finger_state(&hand).0[0]);
    }

    #[test]
    fn finger_boundary_at_margin() {
        for (i, (tip, joint)) in FINGER_JOINTS.iter().enumerate() {
            let mut hand = open_hand();
            let j = hand.point(*joint);
            hand.set_point(*tip, Landmark::new(j.x, j.y + 0.01, 0.0));
            assert!(finger_state(&hand).0[i + 1], "finger {i} should be up");
            hand.set_point(*tip, Landmark::new(j.x, j.y + 0.05, 0.0));
            assert!(!finger_state(&hand).0[i + 1], "finger {i} should be down");
        }
    }

    #[test]
    fn signature_rejects_bad_codes() {
        assert!("10101".parse::<GestureSignature>().is_ok());
        assert!("1010".parse::<GestureSignature>().is_err());
        assert!("10201".parse::<GestureSignature>().is_err());
        assert!("101010".parse::<GestureSignature>().is_err());
    }

    #[test]
    fn signature_round_trips_finger_state() {
        let state = FingerState([true, false, true, true, false]);
        let sig = state.signature();
        assert_eq!(sig.as_str(), "10110");
        assert_eq!(sig.finger_state(), state);
        assert_eq!(state.extended_count(), 3);
    }
}
