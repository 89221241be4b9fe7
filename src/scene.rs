//! Passive scene description: world objects, materials and the single light.
//!
//! Nothing here has behavior beyond construction. The per-frame work happens
//! in [`compose_frame`](crate::compose_frame).

use glam::Vec3;
use rand::Rng;

use crate::mesh::MeshId;

/// Blinn-Phong material coefficients.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    /// Ambient color, added regardless of lighting.
    pub ambient: Vec3,
    /// Diffuse reflectance.
    pub diffuse: Vec3,
    /// Specular reflectance.
    pub specular: Vec3,
    /// Specular exponent.
    pub shininess: f32,
}

impl Material {
    /// A material that only shows its ambient color.
    pub fn unlit(ambient: Vec3) -> Self {
        Self {
            ambient,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            shininess: 1.0,
        }
    }
}

/// How the composer treats an object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ObjectRole {
    /// Ordinary scene content; pulses while animation is on.
    #[default]
    Prop,
    /// The floor. Never animated.
    Ground,
    /// The sphere marking the light position. Never animated.
    LightMarker,
}

impl ObjectRole {
    /// True if the pulse animation applies to this role.
    pub fn pulses(self) -> bool {
        matches!(self, Self::Prop)
    }
}

/// Placement, geometry handle and material of one object.
#[derive(Clone, Debug, PartialEq)]
pub struct WorldObject {
    /// Euler angles in radians, applied X then Y then Z.
    pub rotation: Vec3,
    /// Position of the object's origin.
    pub translation: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
    /// Shared geometry.
    pub mesh: MeshId,
    /// Surface coefficients.
    pub material: Material,
    /// Animation treatment.
    pub role: ObjectRole,
}

impl WorldObject {
    /// An unrotated, unscaled prop at the origin.
    pub fn new(mesh: MeshId, material: Material) -> Self {
        Self {
            rotation: Vec3::ZERO,
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            mesh,
            material,
            role: ObjectRole::Prop,
        }
    }

    /// Set the position.
    pub fn at(mut self, translation: impl Into<Vec3>) -> Self {
        self.translation = translation.into();
        self
    }

    /// Set the per-axis scale.
    ///
    /// # Panics
    ///
    /// Panics if any axis is zero or not finite. Such an object has no
    /// normal matrix and would stop the frame it is drawn in.
    pub fn scaled(mut self, scale: impl Into<Vec3>) -> Self {
        let scale = scale.into();
        assert!(
            scale.is_finite() && scale.cmpne(Vec3::ZERO).all(),
            "degenerate object scale {scale}"
        );
        self.scale = scale;
        self
    }

    /// Set the Euler rotation in radians.
    pub fn rotated(mut self, rotation: impl Into<Vec3>) -> Self {
        self.rotation = rotation.into();
        self
    }

    /// Set the role.
    pub fn role(mut self, role: ObjectRole) -> Self {
        self.role = role;
        self
    }
}

/// A point light.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Light {
    /// World-space position.
    pub position: Vec3,
    /// Emitted color.
    pub color: Vec3,
}

/// Mesh handles used by [`Scene::reference`].
#[derive(Clone, Copy, Debug)]
pub struct SceneMeshes {
    /// Alternating grid meshes, picked by `(i + j) % 2`.
    pub props: [MeshId; 2],
    /// Drawn at the light position.
    pub marker: MeshId,
    /// Stretched into the floor.
    pub ground: MeshId,
}

/// Side length of the reference prop grid.
pub const GRID_SIZE: usize = 10;
/// Distance between neighbouring grid props.
pub const GRID_SPACING: f32 = 2.0;

/// The ordered object collection and its light.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    objects: Vec<WorldObject>,
    light: Light,
}

impl Scene {
    /// An empty scene lit by `light`.
    pub fn new(light: Light) -> Self {
        Self {
            objects: Vec::new(),
            light,
        }
    }

    /// Builds the reference layout: a `GRID_SIZE`² grid of props with random
    /// diffuse/specular colors and shininess, a light marker and a floor.
    pub fn reference(meshes: SceneMeshes, rng: &mut impl Rng) -> Self {
        let light = Light {
            position: Vec3::splat(10.0),
            color: Vec3::splat(0.8),
        };
        let mut scene = Self::new(light);

        for i in 0..GRID_SIZE {
            for j in 0..GRID_SIZE {
                let material = Material {
                    ambient: Vec3::splat(0.2),
                    diffuse: Vec3::new(rng.random(), rng.random(), rng.random()),
                    specular: Vec3::new(rng.random(), rng.random(), rng.random()),
                    shininess: rng.random_range(0..500) as f32,
                };
                let mesh = meshes.props[(i + j) % 2];
                scene.push(
                    WorldObject::new(mesh, material).at([
                        i as f32 * GRID_SPACING,
                        0.0,
                        j as f32 * GRID_SPACING,
                    ]),
                );
            }
        }

        scene.push(
            WorldObject::new(meshes.marker, Material::unlit(Vec3::new(1.0, 1.0, 0.0)))
                .at(light.position)
                .role(ObjectRole::LightMarker),
        );

        // A flattened cube. A zero y-scale would make the normal matrix singular.
        scene.push(
            WorldObject::new(meshes.ground, Material::unlit(Vec3::splat(0.5)))
                .at([10.0, 0.0, 10.0])
                .scaled([25.0, 0.01, 25.0])
                .role(ObjectRole::Ground),
        );

        log::debug!("reference scene built with {} objects", scene.len());
        scene
    }

    /// Append an object; draw order follows insertion order.
    pub fn push(&mut self, object: WorldObject) {
        self.objects.push(object);
    }

    /// All objects in draw order.
    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    /// The object at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn object(&self, index: usize) -> &WorldObject {
        self.objects.get(index).unwrap_or_else(|| {
            panic!(
                "object index {index} out of range (scene holds {})",
                self.objects.len()
            )
        })
    }

    /// The scene light.
    pub fn light(&self) -> &Light {
        &self.light
    }

    /// Number of objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if the scene holds no objects.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn meshes() -> SceneMeshes {
        SceneMeshes {
            props: [MeshId(0), MeshId(1)],
            marker: MeshId(2),
            ground: MeshId(3),
        }
    }

    #[test]
    fn reference_layout() {
        let scene = Scene::reference(meshes(), &mut StdRng::seed_from_u64(7));
        assert_eq!(scene.len(), GRID_SIZE * GRID_SIZE + 2);

        let props: Vec<_> = scene
            .objects()
            .iter()
            .filter(|o| o.role == ObjectRole::Prop)
            .collect();
        assert_eq!(props.len(), 100);
        assert_eq!(props[0].translation, Vec3::ZERO);
        assert_eq!(props[0].mesh, MeshId(0));
        assert_eq!(props[1].translation, Vec3::new(0.0, 0.0, 2.0));
        assert_eq!(props[1].mesh, MeshId(1));
        assert_eq!(props[99].translation, Vec3::new(18.0, 0.0, 18.0));

        for prop in props {
            let m = prop.material;
            assert_eq!(m.ambient, Vec3::splat(0.2));
            assert!(m.diffuse.cmpge(Vec3::ZERO).all() && m.diffuse.cmplt(Vec3::ONE).all());
            assert!(m.specular.cmpge(Vec3::ZERO).all() && m.specular.cmplt(Vec3::ONE).all());
            assert!((0.0..500.0).contains(&m.shininess));
        }
    }

    #[test]
    fn marker_sits_on_the_light() {
        let scene = Scene::reference(meshes(), &mut StdRng::seed_from_u64(1));
        let marker = scene.object(scene.len() - 2);
        assert_eq!(marker.role, ObjectRole::LightMarker);
        assert_eq!(marker.translation, scene.light().position);
        assert_eq!(marker.material.ambient, Vec3::new(1.0, 1.0, 0.0));

        let ground = scene.object(scene.len() - 1);
        assert_eq!(ground.role, ObjectRole::Ground);
        assert!(ground.scale.y > 0.0);
    }

    #[test]
    fn same_seed_same_materials() {
        let a = Scene::reference(meshes(), &mut StdRng::seed_from_u64(42));
        let b = Scene::reference(meshes(), &mut StdRng::seed_from_u64(42));
        assert_eq!(a.objects(), b.objects());
    }

    #[test]
    fn only_props_pulse() {
        assert!(ObjectRole::Prop.pulses());
        assert!(!ObjectRole::Ground.pulses());
        assert!(!ObjectRole::LightMarker.pulses());
    }

    #[test]
    #[should_panic(expected = "degenerate object scale")]
    fn flattened_objects_are_rejected_at_construction() {
        let _ = WorldObject::new(MeshId(0), Material::unlit(Vec3::ONE))
            .scaled([25.0, 0.0, 25.0]);
    }

    #[test]
    fn mirrored_scale_is_allowed() {
        let object = WorldObject::new(MeshId(0), Material::unlit(Vec3::ONE))
            .scaled([-1.0, 0.01, 2.0]);
        assert_eq!(object.scale, Vec3::new(-1.0, 0.01, 2.0));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn object_lookup_is_bounds_checked() {
        let scene = Scene::new(Light::default());
        let _ = scene.object(0);
    }
}
