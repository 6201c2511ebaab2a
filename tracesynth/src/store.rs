//! Profile persistence

// Imports
use {
	crate::profile::Profile,
	anyhow::Context,
	std::{fs, io, path::Path},
};

/// Saves `profile` to `path`.
///
/// Profiles with a `.json` extension are stored as self-describing json,
/// anything else as compact bincode.
pub fn save(profile: &Profile, path: &Path) -> Result<(), anyhow::Error> {
	let file = fs::File::create(path).with_context(|| format!("Unable to create profile file {path:?}"))?;
	let mut file = io::BufWriter::new(file);

	match is_json(path) {
		true => serde_json::to_writer(&mut file, profile)
			.with_context(|| format!("Unable to write profile to {path:?}"))?,
		false => {
			bincode::encode_into_std_write(profile, &mut file, bincode::config::standard())
				.with_context(|| format!("Unable to write profile to {path:?}"))?;
		},
	}

	io::Write::flush(&mut file).with_context(|| format!("Unable to flush profile file {path:?}"))?;
	Ok(())
}

/// Loads a profile from `path`.
///
/// The loaded profile is re-validated, so a corrupted store surfaces as an
/// error here rather than during synthesis.
pub fn load(path: &Path) -> Result<Profile, anyhow::Error> {
	let file = fs::File::open(path).with_context(|| format!("Unable to open profile file {path:?}"))?;
	let mut file = io::BufReader::new(file);

	let profile: Profile = match is_json(path) {
		true => serde_json::from_reader(&mut file).with_context(|| format!("Unable to parse profile {path:?}"))?,
		false => bincode::decode_from_std_read(&mut file, bincode::config::standard())
			.with_context(|| format!("Unable to parse profile {path:?}"))?,
	};

	profile
		.validate()
		.with_context(|| format!("Profile {path:?} is corrupted"))?;
	Ok(profile)
}

/// Returns whether `path` selects the json encoding
fn is_json(path: &Path) -> bool {
	path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

#[cfg(test)]
mod tests {
	// Imports
	use {
		super::*,
		crate::profile::{ActivityModel, AlphaValues},
		std::env,
	};

	fn sample_profile() -> Profile {
		let mut reused = AlphaValues::zeroed(64);
		reused.frequency = 0.5;
		reused.offsets[8] = 1.0;
		reused.kinds = [1.0, 0.0, 0.0];

		let mut cold = AlphaValues::zeroed(64);
		cold.frequency = 0.5;
		cold.offsets[0] = 1.0;
		cold.kinds = [0.0, 1.0, 0.0];

		Profile {
			block_size:     64,
			bin_count:      3,
			total_accesses: 42,
			bins:           vec![reused, AlphaValues::zeroed(64), cold],
			activity:       ActivityModel::always_active(),
		}
	}

	fn scratch_path(name: &str) -> std::path::PathBuf {
		env::temp_dir().join(format!("tracesynth-store-{}-{name}", std::process::id()))
	}

	#[test]
	fn json_round_trip() {
		let path = scratch_path("profile.json");
		let profile = sample_profile();

		save(&profile, &path).expect("Unable to save profile");
		let loaded = load(&path).expect("Unable to load profile");
		fs::remove_file(&path).expect("Unable to remove scratch file");

		assert_eq!(loaded, profile);
	}

	#[test]
	fn bincode_round_trip() {
		let path = scratch_path("profile.bin");
		let profile = sample_profile();

		save(&profile, &path).expect("Unable to save profile");
		let loaded = load(&path).expect("Unable to load profile");
		fs::remove_file(&path).expect("Unable to remove scratch file");

		assert_eq!(loaded, profile);
	}

	#[test]
	fn corrupted_profile_rejected() {
		let path = scratch_path("profile-corrupt.json");
		let mut profile = sample_profile();
		profile.bins[0].frequency = 0.9;

		// Write the raw json directly, bypassing validation on save
		let file = fs::File::create(&path).expect("Unable to create scratch file");
		serde_json::to_writer(file, &profile).expect("Unable to write profile");

		let res = load(&path);
		fs::remove_file(&path).expect("Unable to remove scratch file");
		assert!(res.is_err());
	}

	#[test]
	fn missing_file_rejected() {
		assert!(load(&scratch_path("does-not-exist.json")).is_err());
	}
}
