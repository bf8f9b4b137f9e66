//! Kinematic tree of the robot.
//!
//! A [`RobotModel`] is a list of links in parent-before-child order. Each
//! link hangs off its parent through a static origin and, optionally, one
//! revolute joint. Forward kinematics is a single pass over that list.

use std::f32::consts::FRAC_PI_2;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, UnitVector3, Vector3};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// Specs
// ---------------------------------------------------------------------------

/// Revolute joint between a link and its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct JointSpec {
    pub name: String,
    /// Rotation axis in the child link frame.
    pub axis: UnitVector3<f32>,
    pub lower: f32,
    pub upper: f32,
    /// rad/s at full speed.
    pub max_velocity: f32,
}

impl JointSpec {
    #[must_use]
    pub fn new(name: &str, axis: Vector3<f32>, lower: f32, upper: f32, max_velocity: f32) -> Self {
        Self {
            name: name.into(),
            axis: UnitVector3::new_normalize(axis),
            lower,
            upper,
            max_velocity,
        }
    }

    #[must_use]
    pub fn clamp(&self, angle: f32) -> f32 {
        angle.clamp(self.lower, self.upper)
    }
}

/// One rigid link.
#[derive(Debug, Clone)]
pub struct LinkSpec {
    pub name: String,
    /// Index of the parent link; `None` for the root.
    pub parent: Option<usize>,
    /// Parent frame → this link's frame at zero joint angle.
    pub origin: Isometry3<f32>,
    /// Index into [`RobotModel::joints`].
    pub joint: Option<usize>,
    /// Radius of the collision sphere centred on the link origin.
    pub collision_radius: Option<f32>,
}

// ---------------------------------------------------------------------------
// RobotModel
// ---------------------------------------------------------------------------

/// Tree of links and revolute joints mounted at a fixed world pose.
#[derive(Debug, Clone)]
pub struct RobotModel {
    base: Isometry3<f32>,
    links: Vec<LinkSpec>,
    joints: Vec<JointSpec>,
}

impl RobotModel {
    /// Model with a single root link at `base` (world frame).
    #[must_use]
    pub fn new(root: &str, base: Isometry3<f32>) -> Self {
        Self {
            base,
            links: vec![LinkSpec {
                name: root.into(),
                parent: None,
                origin: Isometry3::identity(),
                joint: None,
                collision_radius: None,
            }],
            joints: Vec::new(),
        }
    }

    /// Attach a rigidly fixed link.
    pub fn add_fixed(
        self,
        name: &str,
        parent: &str,
        origin: Isometry3<f32>,
    ) -> Result<Self, ModelError> {
        self.add_link(name, parent, origin, None)
    }

    /// Attach a link through a revolute joint.
    pub fn add_revolute(
        self,
        name: &str,
        parent: &str,
        origin: Isometry3<f32>,
        joint: JointSpec,
    ) -> Result<Self, ModelError> {
        if self.joint_index(&joint.name).is_some() {
            return Err(ModelError::DuplicateJoint(joint.name));
        }
        if joint.lower > joint.upper {
            return Err(ModelError::InvalidLimits {
                joint: joint.name,
                lower: joint.lower,
                upper: joint.upper,
            });
        }
        self.add_link(name, parent, origin, Some(joint))
    }

    fn add_link(
        mut self,
        name: &str,
        parent: &str,
        origin: Isometry3<f32>,
        joint: Option<JointSpec>,
    ) -> Result<Self, ModelError> {
        if self.link_index(name).is_some() {
            return Err(ModelError::DuplicateLink(name.into()));
        }
        let parent = self
            .link_index(parent)
            .ok_or_else(|| ModelError::UnknownParent {
                link: name.into(),
                parent: parent.into(),
            })?;
        self.push(name, parent, origin, joint);
        Ok(self)
    }

    fn push(&mut self, name: &str, parent: usize, origin: Isometry3<f32>, joint: Option<JointSpec>) {
        let joint = joint.map(|j| {
            self.joints.push(j);
            self.joints.len() - 1
        });
        self.links.push(LinkSpec {
            name: name.into(),
            parent: Some(parent),
            origin,
            joint,
            collision_radius: None,
        });
    }

    /// Give `link` a collision sphere.
    #[must_use]
    pub fn with_collision(mut self, link: &str, radius: f32) -> Self {
        if let Some(i) = self.link_index(link) {
            self.links[i].collision_radius = Some(radius);
        }
        self
    }

    /// Override a joint's limits and velocity.
    pub fn set_limits(
        &mut self,
        joint: &str,
        lower: f32,
        upper: f32,
        max_velocity: f32,
    ) -> Result<(), ModelError> {
        if lower > upper {
            return Err(ModelError::InvalidLimits {
                joint: joint.into(),
                lower,
                upper,
            });
        }
        let i = self
            .joint_index(joint)
            .ok_or_else(|| ModelError::UnknownJoint(joint.into()))?;
        let spec = &mut self.joints[i];
        spec.lower = lower;
        spec.upper = upper;
        spec.max_velocity = max_velocity;
        Ok(())
    }

    #[must_use]
    pub const fn base(&self) -> &Isometry3<f32> {
        &self.base
    }

    #[must_use]
    pub fn links(&self) -> &[LinkSpec] {
        &self.links
    }

    #[must_use]
    pub fn joints(&self) -> &[JointSpec] {
        &self.joints
    }

    #[must_use]
    pub fn link_index(&self, name: &str) -> Option<usize> {
        self.links.iter().position(|l| l.name == name)
    }

    #[must_use]
    pub fn joint_index(&self, name: &str) -> Option<usize> {
        self.joints.iter().position(|j| j.name == name)
    }

    /// World pose of every link for the given joint angles (joint order).
    ///
    /// Missing trailing angles count as zero.
    #[must_use]
    pub fn forward_kinematics(&self, angles: &[f32]) -> Vec<Isometry3<f32>> {
        let mut poses: Vec<Isometry3<f32>> = Vec::with_capacity(self.links.len());
        for link in &self.links {
            let parent = link.parent.map_or(self.base, |p| poses[p]);
            let mut pose = parent * link.origin;
            if let Some(j) = link.joint {
                let angle = angles.get(j).copied().unwrap_or(0.0);
                pose = pose * UnitQuaternion::from_axis_angle(&self.joints[j].axis, angle);
            }
            poses.push(pose);
        }
        poses
    }

    /// Approximate Pepper upper body: head with its three cameras and the
    /// left arm down to the hand.
    #[must_use]
    pub fn pepper() -> Self {
        let x = Vector3::x();
        let y = Vector3::y();
        let z = Vector3::z();

        let mut model = Self::new("torso", Isometry3::translation(0.0, 0.0, 0.82));
        let torso = 0;
        model.push(
            "Neck",
            torso,
            at(-0.038, 0.0, 0.1699),
            Some(JointSpec::new("HeadYaw", z, -2.0857, 2.0857, 7.33)),
        );
        model.push(
            "Head",
            1,
            Isometry3::identity(),
            Some(JointSpec::new("HeadPitch", y, -0.7068, 0.6371, 9.23)),
        );
        let head = 2;
        model.push(
            "CameraTop_optical_frame",
            head,
            at(0.0868, 0.0, 0.0631) * optical(),
            None,
        );
        model.push(
            "CameraBottom_optical_frame",
            head,
            at(0.0936, 0.0, -0.0161) * pitched(0.6929) * optical(),
            None,
        );
        model.push(
            "CameraDepth_optical_frame",
            head,
            at(0.0581, 0.0, -0.0491) * pitched(0.2618) * optical(),
            None,
        );

        model.push(
            "LShoulder",
            torso,
            at(-0.057, 0.149_74, 0.086_82),
            Some(JointSpec::new("LShoulderPitch", y, -2.0857, 2.0857, 7.33)),
        );
        model.push(
            "LBicep",
            6,
            Isometry3::identity(),
            Some(JointSpec::new("LShoulderRoll", z, 0.0087, 1.5620, 9.23)),
        );
        model.push(
            "LElbow",
            7,
            at(0.1812, 0.015, 0.000_13),
            Some(JointSpec::new("LElbowYaw", x, -2.0857, 2.0857, 7.33)),
        );
        model.push(
            "LForeArm",
            8,
            Isometry3::identity(),
            Some(JointSpec::new("LElbowRoll", z, -1.5620, -0.0087, 9.23)),
        );
        model.push("l_wrist", 9, at(0.15, 0.0, 0.0), None);
        model.push("l_hand", 10, at(0.07, 0.0, -0.01), None);

        model
            .with_collision("torso", 0.16)
            .with_collision("Head", 0.11)
            .with_collision("LBicep", 0.05)
            .with_collision("LElbow", 0.045)
            .with_collision("l_wrist", 0.035)
            .with_collision("l_hand", 0.03)
    }
}

fn at(x: f32, y: f32, z: f32) -> Isometry3<f32> {
    Isometry3::from_parts(Translation3::new(x, y, z), UnitQuaternion::identity())
}

fn pitched(angle: f32) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_euler_angles(0.0, angle, 0.0),
    )
}

/// Link frame (x forward, z up) → optical frame (z forward, x right, y down).
fn optical() -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::identity(),
        UnitQuaternion::from_euler_angles(-FRAC_PI_2, 0.0, -FRAC_PI_2),
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
