use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{floating_type_mod::FT, vec2f, IT, V2};

/**
 * A starting mesh: vertex positions plus either spring links or triangle
 * faces, all indices local (per player). The simulation stamps one copy of
 * the asset into every player's slice of the flat arrays on reset.
 */
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub positions: Vec<V2>,
    pub links: Vec<[IT; 2]>,
    pub faces: Vec<[IT; 3]>,
}

const MESH_MAGIC: [u8; 4] = *b"FMSH";
const MESH_VERSION: u32 = 1;

impl MeshAsset {
    /// The hand-built rounded starting blob for arena players.
    pub fn round() -> MeshAsset {
        let positions = vec![
            vec2f(1., 0.),
            vec2f(2., 0.),
            vec2f(0., 1.),
            vec2f(1.5, 1.),
            vec2f(2.5, 1.),
            vec2f(1., 2.),
            vec2f(2., 2.),
        ];

        let links = vec![
            [0, 1],
            [0, 2],
            [0, 3],
            [1, 3],
            [1, 4],
            [2, 3],
            [3, 4],
            [2, 5],
            [3, 5],
            [3, 6],
            [4, 6],
            [5, 6],
        ];

        MeshAsset {
            positions,
            links,
            faces: Vec::new(),
        }
    }

    /// Square grid of `(n + 1)^2` vertices split into `2 * n^2` triangles,
    /// spanning a quarter unit square. Used by the finite-element variant.
    pub fn grid(n: usize) -> MeshAsset {
        assert!(n >= 1, "grid mesh needs at least one edge per row");

        let mut positions = Vec::with_capacity((n + 1) * (n + 1));
        for i in 0..=n {
            for j in 0..=n {
                positions.push(vec2f(i as FT, j as FT) / n as FT * 0.25);
            }
        }

        let mut faces = Vec::with_capacity(2 * n * n);
        for i in 0..n {
            for j in 0..n {
                let a = (i * (n + 1) + j) as IT;
                let b = a + 1;
                let c = a + n as IT + 2;
                let d = a + n as IT + 1;
                faces.push([a, b, c]);
                faces.push([c, d, a]);
            }
        }

        MeshAsset {
            positions,
            links: Vec::new(),
            faces,
        }
    }

    pub fn read_mesh_file(path: &Path) -> io::Result<MeshAsset> {
        let mut reader = BufReader::new(File::open(path)?);

        let mut magic = [0u8; 4];
        io::Read::read_exact(&mut reader, &mut magic)?;
        if magic != MESH_MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "not a mesh asset file"));
        }
        let version = reader.read_u32::<LittleEndian>()?;
        if version != MESH_VERSION {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unsupported mesh asset version {}", version),
            ));
        }

        let vert_count = reader.read_u32::<LittleEndian>()? as usize;
        let link_count = reader.read_u32::<LittleEndian>()? as usize;
        let face_count = reader.read_u32::<LittleEndian>()? as usize;

        let mut positions = Vec::with_capacity(vert_count);
        for _ in 0..vert_count {
            let x = reader.read_f32::<LittleEndian>()? as FT;
            let y = reader.read_f32::<LittleEndian>()? as FT;
            positions.push(vec2f(x, y));
        }

        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            let a = reader.read_i32::<LittleEndian>()?;
            let b = reader.read_i32::<LittleEndian>()?;
            links.push([a, b]);
        }

        let mut faces = Vec::with_capacity(face_count);
        for _ in 0..face_count {
            let a = reader.read_i32::<LittleEndian>()?;
            let b = reader.read_i32::<LittleEndian>()?;
            let c = reader.read_i32::<LittleEndian>()?;
            faces.push([a, b, c]);
        }

        let asset = MeshAsset {
            positions,
            links,
            faces,
        };
        if !asset.indices_in_range() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mesh asset references out-of-range vertices",
            ));
        }
        Ok(asset)
    }

    pub fn write_mesh_file(&self, path: &Path) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);

        io::Write::write_all(&mut writer, &MESH_MAGIC)?;
        writer.write_u32::<LittleEndian>(MESH_VERSION)?;
        writer.write_u32::<LittleEndian>(self.positions.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.links.len() as u32)?;
        writer.write_u32::<LittleEndian>(self.faces.len() as u32)?;

        for position in &self.positions {
            writer.write_f32::<LittleEndian>(position.x as f32)?;
            writer.write_f32::<LittleEndian>(position.y as f32)?;
        }
        for link in &self.links {
            writer.write_i32::<LittleEndian>(link[0])?;
            writer.write_i32::<LittleEndian>(link[1])?;
        }
        for face in &self.faces {
            writer.write_i32::<LittleEndian>(face[0])?;
            writer.write_i32::<LittleEndian>(face[1])?;
            writer.write_i32::<LittleEndian>(face[2])?;
        }
        Ok(())
    }

    pub fn indices_in_range(&self) -> bool {
        let vert_count = self.positions.len() as IT;
        let link_ok = self
            .links
            .iter()
            .all(|link| link.iter().all(|&v| v >= 0 && v < vert_count));
        let face_ok = self
            .faces
            .iter()
            .all(|face| face.iter().all(|&v| v >= 0 && v < vert_count));
        link_ok && face_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_meshes_are_valid() {
        let round = MeshAsset::round();
        assert_eq!(round.positions.len(), 7);
        assert_eq!(round.links.len(), 12);
        assert!(round.indices_in_range());

        let grid = MeshAsset::grid(4);
        assert_eq!(grid.positions.len(), 25);
        assert_eq!(grid.faces.len(), 32);
        assert!(grid.indices_in_range());

        // every grid triangle must span a real area
        for face in &grid.faces {
            let a = grid.positions[face[0] as usize];
            let b = grid.positions[face[1] as usize];
            let c = grid.positions[face[2] as usize];
            assert!((a - c).perp(&(b - c)).abs() > 0.);
        }
    }

    #[test]
    fn mesh_file_roundtrip() {
        let path = std::env::temp_dir().join("flubsim-mesh-roundtrip-test.mesh");

        let asset = MeshAsset::round();
        asset.write_mesh_file(&path).unwrap();
        let loaded = MeshAsset::read_mesh_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.positions.len(), asset.positions.len());
        for (a, b) in loaded.positions.iter().zip(asset.positions.iter()) {
            assert_eq!(a.x as f32, b.x as f32);
            assert_eq!(a.y as f32, b.y as f32);
        }
        assert_eq!(loaded.links, asset.links);
        assert_eq!(loaded.faces, asset.faces);
    }

    #[test]
    fn rejects_out_of_range_indices() {
        let path = std::env::temp_dir().join("flubsim-mesh-invalid-test.mesh");

        let mut asset = MeshAsset::round();
        asset.links.push([0, 99]);
        asset.write_mesh_file(&path).unwrap();
        let result = MeshAsset::read_mesh_file(&path);
        std::fs::remove_file(&path).unwrap();

        assert!(result.is_err());
    }
}
