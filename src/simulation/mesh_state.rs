use nalgebra::zero;

use crate::{player_index::PlayerLayout, vec2i, vec3i, M2, V2, VI};

macro_rules! decl_vertex_vec {
    (pub struct $struct_name:ident { $(pub $field_name:ident: Vec<$field_type:ty> | $default_value:expr),*$(,)?  }) => {
        pub struct $struct_name {
            $(
                pub $field_name : Vec<$field_type>,
            )*
        }

        impl $struct_name {
            pub fn default(len: usize) -> Self {
                Self {
                    $(
                        $field_name: (0..len).map(|_| $default_value).collect::<Vec<$field_type>>(),
                    )*
                }
            }
        }
    }
}

decl_vertex_vec! {
    pub struct VertexVec {
        pub position: Vec<V2> | zero(),
        pub velocity: Vec<V2> | zero(),

        // transient, recomputed every sub-step
        pub force: Vec<V2> | zero(),

        pub enabled: Vec<bool> | false,
    }
}

/**
 * Fixed-capacity storage for the whole mesh. Capacity is computed once from
 * the player layout; destruction only flips `enabled` flags and writes the
 * `-1` sentinel into link/face slots, it never reallocates.
 */
pub struct MeshState {
    pub verts: VertexVec,

    /// Spring endpoints. `links[l][0] == -1` marks an empty slot.
    pub links: Vec<VI<2>>,

    /// Triangle vertex ids. `faces[f][0] == -1` marks an empty slot.
    pub faces: Vec<VI<3>>,

    /// Inverse rest-state edge matrix per face, fixed between resets.
    pub face_shape_inv: Vec<M2>,

    pub layout: PlayerLayout,
}

impl MeshState {
    pub fn new(layout: PlayerLayout) -> MeshState {
        MeshState {
            verts: VertexVec::default(layout.vert_count()),
            links: vec![vec2i(-1, -1); layout.link_count()],
            faces: vec![vec3i(-1, -1, -1); layout.face_count()],
            face_shape_inv: vec![M2::identity(); layout.face_count()],
            layout,
        }
    }

    pub fn vert_count(&self) -> usize {
        self.verts.position.len()
    }

    pub fn link_active(&self, link: usize) -> bool {
        self.links[link][0] >= 0
    }

    pub fn face_active(&self, face: usize) -> bool {
        self.faces[face][0] >= 0
    }

    pub fn active_link_count(&self) -> usize {
        (0..self.links.len()).filter(|&l| self.link_active(l)).count()
    }

    pub fn active_face_count(&self) -> usize {
        (0..self.faces.len()).filter(|&f| self.face_active(f)).count()
    }
}
