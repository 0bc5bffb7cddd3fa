//! Local transform component.
use std::fmt;

use nalgebra::{
    self as na, Matrix4, Quaternion, Unit, UnitQuaternion, Vector2, Vector3,
};
use serde::{
    de::{self, Deserializer, MapAccess, SeqAccess, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};
use specs::prelude::{Component, DenseVecStorage, FlaggedStorage};

/// World-space matrix of an entity, baked from its local transform and its
/// ancestor chain by the transform system.
#[derive(Debug, Copy, Clone)]
pub struct GlobalTransform(pub Matrix4<f32>);

impl GlobalTransform {
    pub fn is_finite(&self) -> bool {
        self.0.as_slice().iter().all(|f| f32::is_finite(*f))
    }

    /// Inverse transpose of the world matrix, for transforming normals under
    /// non-uniform scale. Falls back to identity when the matrix is not
    /// invertible (zero scale collapses the local space).
    pub fn normal_matrix(&self) -> Matrix4<f32> {
        match self.0.try_inverse() {
            Some(inverse) => inverse.transpose(),
            None => na::one(),
        }
    }
}

impl Component for GlobalTransform {
    type Storage = FlaggedStorage<Self, DenseVecStorage<Self>>;
}

impl Default for GlobalTransform {
    fn default() -> Self {
        GlobalTransform(na::one())
    }
}

/// Shear coefficients, one pair per source axis in axis order:
/// `x` = (x->y, x->z), `y` = (y->x, y->z), `z` = (z->x, z->y).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shear {
    pub x: Vector2<f32>,
    pub y: Vector2<f32>,
    pub z: Vector2<f32>,
}

impl Shear {
    pub fn new(x: Vector2<f32>, y: Vector2<f32>, z: Vector2<f32>) -> Self {
        Shear { x, y, z }
    }

    pub fn is_zero(&self) -> bool {
        self == &Shear::default()
    }

    /// The shear matrix: identity with the six off-diagonal entries set from
    /// the coefficient pairs.
    pub fn matrix(&self) -> Matrix4<f32> {
        let mut m = Matrix4::identity();
        m[(1, 0)] = self.x.x;
        m[(2, 0)] = self.x.y;
        m[(0, 1)] = self.y.x;
        m[(2, 1)] = self.y.y;
        m[(0, 2)] = self.z.x;
        m[(1, 2)] = self.z.y;
        m
    }
}

impl Default for Shear {
    fn default() -> Self {
        Shear {
            x: na::zero(),
            y: na::zero(),
            z: na::zero(),
        }
    }
}

/// Scaling about a pivot: `T(pivot) * S(scale) * T(-pivot)`.
pub(crate) fn scaling_about(pivot: &Vector3<f32>, scale: &Vector3<f32>) -> Matrix4<f32> {
    Matrix4::new_translation(pivot)
        * Matrix4::new_nonuniform_scaling(scale)
        * Matrix4::new_translation(&-*pivot)
}

/// Local transform of a scene node, relative to its parent's space (or the
/// world, for roots).
///
/// Rotation and scale are applied about `pivot` rather than the node origin,
/// and shear is the innermost operation: a local point is sheared, then
/// scaled and rotated about the pivot, then translated.
#[derive(Clone, Debug, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
    pub pivot: Vector3<f32>,
    pub shear: Shear,
}

impl Transform {
    pub fn new(
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Transform {
            position,
            rotation,
            scale,
            ..Default::default()
        }
    }

    /// The full local matrix, shear included.
    pub fn matrix(&self) -> Matrix4<f32> {
        self.matrix_without_shear() * self.shear.matrix()
    }

    /// The local matrix minus shear:
    /// `T(position) * [T(pivot) * R * T(-pivot)] * [T(pivot) * S * T(-pivot)]`.
    pub fn matrix_without_shear(&self) -> Matrix4<f32> {
        self.matrix_raw() * scaling_about(&self.pivot, &self.scale)
    }

    /// Translation and pivot-rotation only. This is the part of a node's
    /// transform that its descendants inherit through the matrix product;
    /// scale and shear are accumulated separately so they cannot smear into
    /// spurious shear further down the chain.
    pub fn matrix_raw(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position)
            * Matrix4::new_translation(&self.pivot)
            * self.rotation.to_homogeneous()
            * Matrix4::new_translation(&-self.pivot)
    }

    /// Local -Z axis under this transform's rotation.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * -Vector3::z()
    }

    /// Local +X axis under this transform's rotation.
    pub fn right(&self) -> Vector3<f32> {
        self.rotation * Vector3::x()
    }

    /// Local +Y axis under this transform's rotation.
    pub fn up(&self) -> Vector3<f32> {
        self.rotation * Vector3::y()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: na::zero(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            pivot: na::zero(),
            shear: Shear::default(),
        }
    }
}

impl Component for Transform {
    type Storage = FlaggedStorage<Self, DenseVecStorage<Self>>;
}

impl From<Vector3<f32>> for Transform {
    fn from(position: Vector3<f32>) -> Self {
        Transform {
            position,
            ..Default::default()
        }
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D>(deserializer: D) -> Result<Transform, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(field_identifier, rename_all = "snake_case")]
        enum Field {
            Translation,
            EulerRotation,
            QuaternionRotation,
            Scale,
            Pivot,
            Shear,
        };

        struct TransformVisitor;

        impl<'de> Visitor<'de> for TransformVisitor {
            type Value = Transform;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("struct Transform")
            }

            fn visit_seq<V>(self, mut seq: V) -> Result<Self::Value, V::Error>
            where
                V: SeqAccess<'de>,
            {
                let translation: [f32; 3] = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let rotation: [f32; 4] = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                let scale: [f32; 3] = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(2, &self))?;
                let pivot: [f32; 3] = seq.next_element()?.unwrap_or([0.0; 3]);
                let shear: [[f32; 2]; 3] = seq.next_element()?.unwrap_or([[0.0; 2]; 3]);

                Ok(Transform {
                    position: Vector3::new(translation[0], translation[1], translation[2]),
                    // quaternions are xyzw on the wire
                    rotation: Unit::new_normalize(Quaternion::new(
                        rotation[3],
                        rotation[0],
                        rotation[1],
                        rotation[2],
                    )),
                    scale: Vector3::new(scale[0], scale[1], scale[2]),
                    pivot: Vector3::new(pivot[0], pivot[1], pivot[2]),
                    shear: Shear::new(
                        Vector2::new(shear[0][0], shear[0][1]),
                        Vector2::new(shear[1][0], shear[1][1]),
                        Vector2::new(shear[2][0], shear[2][1]),
                    ),
                })
            }

            fn visit_map<V>(self, mut map: V) -> Result<Self::Value, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut translation = None;
                let mut rotation = None;
                let mut scale = None;
                let mut pivot = None;
                let mut shear = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Translation => {
                            if translation.is_some() {
                                return Err(de::Error::duplicate_field("translation"));
                            }
                            translation = Some(map.next_value()?);
                        }
                        Field::EulerRotation => {
                            if rotation.is_some() {
                                return Err(de::Error::duplicate_field("rotation"));
                            }
                            let eulers: [f32; 3] = map.next_value()?;
                            rotation = Some(UnitQuaternion::from_euler_angles(
                                eulers[0], eulers[1], eulers[2],
                            ));
                        }
                        Field::QuaternionRotation => {
                            if rotation.is_some() {
                                return Err(de::Error::duplicate_field("rotation"));
                            }
                            let rotation_vals: [f32; 4] = map.next_value()?;
                            rotation = Some(UnitQuaternion::from_quaternion(Quaternion::new(
                                rotation_vals[3],
                                rotation_vals[0],
                                rotation_vals[1],
                                rotation_vals[2],
                            )));
                        }
                        Field::Scale => {
                            if scale.is_some() {
                                return Err(de::Error::duplicate_field("scale"));
                            }
                            scale = Some(map.next_value()?);
                        }
                        Field::Pivot => {
                            if pivot.is_some() {
                                return Err(de::Error::duplicate_field("pivot"));
                            }
                            pivot = Some(map.next_value()?);
                        }
                        Field::Shear => {
                            if shear.is_some() {
                                return Err(de::Error::duplicate_field("shear"));
                            }
                            shear = Some(map.next_value()?);
                        }
                    }
                }
                let translation: [f32; 3] = translation.unwrap_or([0.0; 3]);
                let rotation: UnitQuaternion<f32> = rotation.unwrap_or(UnitQuaternion::identity());
                let scale: [f32; 3] = scale.unwrap_or([1.0; 3]);
                let pivot: [f32; 3] = pivot.unwrap_or([0.0; 3]);
                let shear: [[f32; 2]; 3] = shear.unwrap_or([[0.0; 2]; 3]);

                Ok(Transform {
                    position: Vector3::new(translation[0], translation[1], translation[2]),
                    rotation,
                    scale: Vector3::new(scale[0], scale[1], scale[2]),
                    pivot: Vector3::new(pivot[0], pivot[1], pivot[2]),
                    shear: Shear::new(
                        Vector2::new(shear[0][0], shear[0][1]),
                        Vector2::new(shear[1][0], shear[1][1]),
                        Vector2::new(shear[2][0], shear[2][1]),
                    ),
                })
            }
        }

        const FIELDS: &'static [&'static str] =
            &["translation", "rotation", "scale", "pivot", "shear"];
        deserializer.deserialize_struct("Transform", FIELDS, TransformVisitor)
    }
}

impl Serialize for Transform {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        struct TransformValues {
            translation: [f32; 3],
            quaternion_rotation: [f32; 4],
            scale: [f32; 3],
            pivot: [f32; 3],
            shear: [[f32; 2]; 3],
        }

        Serialize::serialize(
            &TransformValues {
                translation: self.position.into(),
                quaternion_rotation: self.rotation.as_ref().coords.into(),
                scale: self.scale.into(),
                pivot: self.pivot.into(),
                shear: [
                    self.shear.x.into(),
                    self.shear.y.into(),
                    self.shear.z.into(),
                ],
            },
            serializer,
        )
    }
}
