//! Standard payload layouts (types 0x00-0x06).
//!
//! Each standard payload is a fixed little-endian sequence of IEEE-754 `f32`
//! values in the East-North-Up, right-handed frame. Vendor payloads
//! (0x80-0xFF) are opaque to the codec.

use core::fmt;

use bytes::{Buf, BufMut};

use crate::error::{FrameError, ParseErrorKind, Result};

/// Allowed deviation of `|q|` from 1 for attitude quaternions.
pub const QUATERNION_NORM_TOLERANCE: f32 = 1e-3;

/// First vendor-specific payload type.
pub const VENDOR_TYPE_START: u8 = 0x80;

/// A payload with a registered type identifier and fixed wire layout.
pub trait Payload: Sized {
    /// Payload type written to the header.
    const TYPE_ID: u8;
    /// Encoded length in bytes.
    const SIZE: usize;

    /// Write the payload into `dst`, returning the number of bytes written.
    fn write(&self, dst: &mut [u8]) -> Result<usize>;

    /// Read the payload from exactly [`Self::SIZE`] bytes.
    fn read(src: &[u8]) -> Result<Self>;
}

/// Accelerometer only, `m/s²`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu3Acc {
    pub acc_x: f32,
    pub acc_y: f32,
    pub acc_z: f32,
}

/// Gyroscope only, `rad/s`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu3Gyr {
    pub gyr_x: f32,
    pub gyr_y: f32,
    pub gyr_z: f32,
}

/// Magnetometer only, `µT`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu3Mag {
    pub mag_x: f32,
    pub mag_y: f32,
    pub mag_z: f32,
}

/// 6-axis: accelerometer + gyroscope.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu6 {
    pub acc: Imu3Acc,
    pub gyr: Imu3Gyr,
}

/// 9-axis: accelerometer + gyroscope + magnetometer.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu9 {
    pub acc: Imu3Acc,
    pub gyr: Imu3Gyr,
    pub mag: Imu3Mag,
}

/// 10-axis: 9-axis plus barometric pressure in `Pa`.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Imu10 {
    pub acc: Imu3Acc,
    pub gyr: Imu3Gyr,
    pub mag: Imu3Mag,
    pub baro: f32,
}

/// Attitude as a Hamiltonian quaternion in w-x-y-z order. Must be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImuQuat {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for ImuQuat {
    fn default() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl ImuQuat {
    /// Squared Euclidean norm.
    pub fn norm_squared(&self) -> f32 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Whether the quaternion is unit length within [`QUATERNION_NORM_TOLERANCE`].
    ///
    /// Compares the squared norm against squared bounds, so no `sqrt` is
    /// needed on targets without `std`.
    pub fn is_normalized(&self) -> bool {
        const LOW: f32 = (1.0 - QUATERNION_NORM_TOLERANCE) * (1.0 - QUATERNION_NORM_TOLERANCE);
        const HIGH: f32 = (1.0 + QUATERNION_NORM_TOLERANCE) * (1.0 + QUATERNION_NORM_TOLERANCE);
        let n2 = self.norm_squared();
        (LOW..=HIGH).contains(&n2)
    }
}

trait FloatLayout<const N: usize>: Sized {
    fn to_floats(&self) -> [f32; N];
    fn from_floats(v: [f32; N]) -> Self;
}

impl FloatLayout<3> for Imu3Acc {
    fn to_floats(&self) -> [f32; 3] {
        [self.acc_x, self.acc_y, self.acc_z]
    }

    fn from_floats([acc_x, acc_y, acc_z]: [f32; 3]) -> Self {
        Self {
            acc_x,
            acc_y,
            acc_z,
        }
    }
}

impl FloatLayout<3> for Imu3Gyr {
    fn to_floats(&self) -> [f32; 3] {
        [self.gyr_x, self.gyr_y, self.gyr_z]
    }

    fn from_floats([gyr_x, gyr_y, gyr_z]: [f32; 3]) -> Self {
        Self {
            gyr_x,
            gyr_y,
            gyr_z,
        }
    }
}

impl FloatLayout<3> for Imu3Mag {
    fn to_floats(&self) -> [f32; 3] {
        [self.mag_x, self.mag_y, self.mag_z]
    }

    fn from_floats([mag_x, mag_y, mag_z]: [f32; 3]) -> Self {
        Self {
            mag_x,
            mag_y,
            mag_z,
        }
    }
}

impl FloatLayout<6> for Imu6 {
    fn to_floats(&self) -> [f32; 6] {
        let [ax, ay, az] = self.acc.to_floats();
        let [gx, gy, gz] = self.gyr.to_floats();
        [ax, ay, az, gx, gy, gz]
    }

    fn from_floats([ax, ay, az, gx, gy, gz]: [f32; 6]) -> Self {
        Self {
            acc: Imu3Acc::from_floats([ax, ay, az]),
            gyr: Imu3Gyr::from_floats([gx, gy, gz]),
        }
    }
}

impl FloatLayout<9> for Imu9 {
    fn to_floats(&self) -> [f32; 9] {
        let [ax, ay, az] = self.acc.to_floats();
        let [gx, gy, gz] = self.gyr.to_floats();
        let [mx, my, mz] = self.mag.to_floats();
        [ax, ay, az, gx, gy, gz, mx, my, mz]
    }

    fn from_floats([ax, ay, az, gx, gy, gz, mx, my, mz]: [f32; 9]) -> Self {
        Self {
            acc: Imu3Acc::from_floats([ax, ay, az]),
            gyr: Imu3Gyr::from_floats([gx, gy, gz]),
            mag: Imu3Mag::from_floats([mx, my, mz]),
        }
    }
}

impl FloatLayout<10> for Imu10 {
    fn to_floats(&self) -> [f32; 10] {
        let [ax, ay, az] = self.acc.to_floats();
        let [gx, gy, gz] = self.gyr.to_floats();
        let [mx, my, mz] = self.mag.to_floats();
        [ax, ay, az, gx, gy, gz, mx, my, mz, self.baro]
    }

    fn from_floats([ax, ay, az, gx, gy, gz, mx, my, mz, baro]: [f32; 10]) -> Self {
        Self {
            acc: Imu3Acc::from_floats([ax, ay, az]),
            gyr: Imu3Gyr::from_floats([gx, gy, gz]),
            mag: Imu3Mag::from_floats([mx, my, mz]),
            baro,
        }
    }
}

impl FloatLayout<4> for ImuQuat {
    fn to_floats(&self) -> [f32; 4] {
        [self.w, self.x, self.y, self.z]
    }

    fn from_floats([w, x, y, z]: [f32; 4]) -> Self {
        Self { w, x, y, z }
    }
}

fn write_floats<const N: usize>(values: &[f32; N], dst: &mut [u8]) -> Result<usize> {
    let size = N * 4;
    let available = dst.len();
    let mut out = dst
        .get_mut(..size)
        .ok_or_else(|| FrameError::underflow(size, available))?;
    for value in values {
        out.put_f32_le(*value);
    }
    Ok(size)
}

fn read_floats<const N: usize>(src: &[u8]) -> Result<[f32; N]> {
    let size = N * 4;
    if src.len() < size {
        return Err(FrameError::underflow(size, src.len()));
    }
    if src.len() > size {
        return Err(ParseErrorKind::PayloadLengthMismatch {
            expected: size,
            found: src.len(),
        }
        .into());
    }
    let mut src = src;
    let mut values = [0f32; N];
    for value in &mut values {
        *value = src.get_f32_le();
    }
    Ok(values)
}

macro_rules! float_payload {
    ($ty:ty, $id:expr, $n:literal) => {
        impl Payload for $ty {
            const TYPE_ID: u8 = $id;
            const SIZE: usize = $n * 4;

            fn write(&self, dst: &mut [u8]) -> Result<usize> {
                write_floats(&FloatLayout::<$n>::to_floats(self), dst)
            }

            fn read(src: &[u8]) -> Result<Self> {
                read_floats::<$n>(src).map(<Self as FloatLayout<$n>>::from_floats)
            }
        }
    };
}

float_payload!(Imu3Acc, 0x00, 3);
float_payload!(Imu3Gyr, 0x01, 3);
float_payload!(Imu3Mag, 0x02, 3);
float_payload!(Imu6, 0x03, 6);
float_payload!(Imu9, 0x04, 9);
float_payload!(Imu10, 0x05, 10);

impl Payload for ImuQuat {
    const TYPE_ID: u8 = 0x06;
    const SIZE: usize = 16;

    fn write(&self, dst: &mut [u8]) -> Result<usize> {
        if !self.is_normalized() {
            return Err(ParseErrorKind::NonUnitQuaternion.into());
        }
        write_floats(&self.to_floats(), dst)
    }

    fn read(src: &[u8]) -> Result<Self> {
        let quat = Self::from_floats(read_floats::<4>(src)?);
        if !quat.is_normalized() {
            return Err(ParseErrorKind::NonUnitQuaternion.into());
        }
        Ok(quat)
    }
}

/// Classification of a header `payload_type` byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadType {
    Imu3Acc,
    Imu3Gyr,
    Imu3Mag,
    Imu6,
    Imu9,
    Imu10,
    ImuQuat,
    /// Standard range, not yet assigned.
    Reserved(u8),
    /// Vendor-specific, uninterpreted.
    Vendor(u8),
}

impl PayloadType {
    pub fn classify(byte: u8) -> Self {
        match byte {
            0x00 => PayloadType::Imu3Acc,
            0x01 => PayloadType::Imu3Gyr,
            0x02 => PayloadType::Imu3Mag,
            0x03 => PayloadType::Imu6,
            0x04 => PayloadType::Imu9,
            0x05 => PayloadType::Imu10,
            0x06 => PayloadType::ImuQuat,
            b if b < VENDOR_TYPE_START => PayloadType::Reserved(b),
            b => PayloadType::Vendor(b),
        }
    }

    /// Fixed payload length, for assigned standard types.
    pub fn expected_size(self) -> Option<usize> {
        match self {
            PayloadType::Imu3Acc => Some(Imu3Acc::SIZE),
            PayloadType::Imu3Gyr => Some(Imu3Gyr::SIZE),
            PayloadType::Imu3Mag => Some(Imu3Mag::SIZE),
            PayloadType::Imu6 => Some(Imu6::SIZE),
            PayloadType::Imu9 => Some(Imu9::SIZE),
            PayloadType::Imu10 => Some(Imu10::SIZE),
            PayloadType::ImuQuat => Some(ImuQuat::SIZE),
            PayloadType::Reserved(_) | PayloadType::Vendor(_) => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PayloadType::Imu3Acc => "imu3-acc",
            PayloadType::Imu3Gyr => "imu3-gyr",
            PayloadType::Imu3Mag => "imu3-mag",
            PayloadType::Imu6 => "imu6",
            PayloadType::Imu9 => "imu9",
            PayloadType::Imu10 => "imu10",
            PayloadType::ImuQuat => "imu-quat",
            PayloadType::Reserved(_) => "reserved",
            PayloadType::Vendor(_) => "vendor",
        }
    }
}

/// A decoded standard payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StandardPayload {
    Imu3Acc(Imu3Acc),
    Imu3Gyr(Imu3Gyr),
    Imu3Mag(Imu3Mag),
    Imu6(Imu6),
    Imu9(Imu9),
    Imu10(Imu10),
    ImuQuat(ImuQuat),
}

impl StandardPayload {
    /// Decode `bytes` according to `payload_type`.
    ///
    /// Returns `Ok(None)` for reserved and vendor types.
    pub fn decode(payload_type: u8, bytes: &[u8]) -> Result<Option<Self>> {
        let decoded = match PayloadType::classify(payload_type) {
            PayloadType::Imu3Acc => StandardPayload::Imu3Acc(Imu3Acc::read(bytes)?),
            PayloadType::Imu3Gyr => StandardPayload::Imu3Gyr(Imu3Gyr::read(bytes)?),
            PayloadType::Imu3Mag => StandardPayload::Imu3Mag(Imu3Mag::read(bytes)?),
            PayloadType::Imu6 => StandardPayload::Imu6(Imu6::read(bytes)?),
            PayloadType::Imu9 => StandardPayload::Imu9(Imu9::read(bytes)?),
            PayloadType::Imu10 => StandardPayload::Imu10(Imu10::read(bytes)?),
            PayloadType::ImuQuat => StandardPayload::ImuQuat(ImuQuat::read(bytes)?),
            PayloadType::Reserved(_) | PayloadType::Vendor(_) => return Ok(None),
        };
        Ok(Some(decoded))
    }

    /// Component values in wire order.
    pub fn values(&self) -> impl Iterator<Item = f32> {
        let (buf, len): ([f32; 10], usize) = match self {
            StandardPayload::Imu3Acc(p) => pad(p.to_floats()),
            StandardPayload::Imu3Gyr(p) => pad(p.to_floats()),
            StandardPayload::Imu3Mag(p) => pad(p.to_floats()),
            StandardPayload::Imu6(p) => pad(p.to_floats()),
            StandardPayload::Imu9(p) => pad(p.to_floats()),
            StandardPayload::Imu10(p) => pad(p.to_floats()),
            StandardPayload::ImuQuat(p) => pad(p.to_floats()),
        };
        buf.into_iter().take(len)
    }
}

fn pad<const N: usize>(values: [f32; N]) -> ([f32; 10], usize) {
    let mut buf = [0f32; 10];
    buf[..N].copy_from_slice(&values);
    (buf, N)
}

impl fmt::Display for StandardPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_imu6() -> Imu6 {
        Imu6 {
            acc: Imu3Acc {
                acc_x: 0.001,
                acc_y: 0.002,
                acc_z: 9.81,
            },
            gyr: Imu3Gyr {
                gyr_x: 0.004,
                gyr_y: 0.005,
                gyr_z: 0.006,
            },
        }
    }

    #[test]
    fn sizes_match_layouts() {
        assert_eq!(Imu3Acc::SIZE, 12);
        assert_eq!(Imu6::SIZE, 24);
        assert_eq!(Imu9::SIZE, 36);
        assert_eq!(Imu10::SIZE, 40);
        assert_eq!(ImuQuat::SIZE, 16);
    }

    #[test]
    fn imu6_wire_order_is_acc_then_gyr() {
        let mut buf = [0u8; 24];
        assert_eq!(sample_imu6().write(&mut buf).unwrap(), 24);
        assert_eq!(&buf[0..4], &0.001f32.to_le_bytes());
        assert_eq!(&buf[8..12], &9.81f32.to_le_bytes());
        assert_eq!(&buf[20..24], &0.006f32.to_le_bytes());
        assert_eq!(Imu6::read(&buf).unwrap(), sample_imu6());
    }

    #[test]
    fn write_into_short_buffer_underflows() {
        let mut buf = [0u8; 10];
        assert!(matches!(
            sample_imu6().write(&mut buf),
            Err(FrameError::BufferUnderflow { needed: 24, .. })
        ));
    }

    #[test]
    fn read_rejects_wrong_length() {
        assert!(matches!(
            Imu3Acc::read(&[0u8; 8]),
            Err(FrameError::BufferUnderflow { .. })
        ));
        assert!(matches!(
            Imu3Acc::read(&[0u8; 16]),
            Err(FrameError::ParseError(ParseErrorKind::PayloadLengthMismatch {
                expected: 12,
                found: 16
            }))
        ));
    }

    #[test]
    fn quaternion_must_be_unit() {
        let mut buf = [0u8; 16];
        let skewed = ImuQuat {
            w: 1.0,
            x: 0.5,
            y: 0.0,
            z: 0.0,
        };
        assert!(matches!(
            skewed.write(&mut buf),
            Err(FrameError::ParseError(ParseErrorKind::NonUnitQuaternion))
        ));

        let half = std::f32::consts::FRAC_1_SQRT_2;
        let valid = ImuQuat {
            w: half,
            x: 0.0,
            y: 0.0,
            z: half,
        };
        valid.write(&mut buf).unwrap();
        assert_eq!(ImuQuat::read(&buf).unwrap(), valid);

        buf[..4].copy_from_slice(&2.0f32.to_le_bytes());
        assert!(ImuQuat::read(&buf).is_err());
    }

    #[test]
    fn classify_ranges() {
        assert_eq!(PayloadType::classify(0x03), PayloadType::Imu6);
        assert_eq!(PayloadType::classify(0x07), PayloadType::Reserved(0x07));
        assert_eq!(PayloadType::classify(0x7F), PayloadType::Reserved(0x7F));
        assert_eq!(PayloadType::classify(0x80), PayloadType::Vendor(0x80));
        assert_eq!(PayloadType::classify(0x06).expected_size(), Some(16));
        assert_eq!(PayloadType::classify(0xFE).expected_size(), None);
    }

    #[test]
    fn standard_decode_dispatches_on_type() {
        let mut buf = [0u8; 24];
        sample_imu6().write(&mut buf).unwrap();
        let decoded = StandardPayload::decode(Imu6::TYPE_ID, &buf).unwrap().unwrap();
        assert_eq!(decoded, StandardPayload::Imu6(sample_imu6()));
        assert_eq!(decoded.values().count(), 6);
        assert!(StandardPayload::decode(0x90, &buf).unwrap().is_none());
    }
}
